//! Error types for proxy operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Configuration validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Proxy chain could not be fully resolved: {failures}")]
    ChainResolution { failures: String },

    #[error("Port {port} is already in use, pick another port with -p/--port")]
    PortInUse { port: u16 },

    #[error("Failed to bind port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("TLS setup error: {0}")]
    Tls(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid IPv4 address: {entry}")]
    InvalidAddress { entry: String },

    #[error("Invalid address range {entry}: lower bound exceeds upper bound")]
    RangeOrder { entry: String },

    #[error("Invalid proxy hop '{token}': {reason}")]
    InvalidHop { token: String, reason: String },

    #[error("Invalid user entry '{entry}': expected username:password")]
    InvalidUser { entry: String },

    #[error("TLS requires both --cert-file and --key-file")]
    TlsPairing,
}
