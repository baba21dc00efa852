//! Forward SOCKS5 proxy server with upstream chaining and IPv4
//! session filtering, configured entirely from the command line

pub mod bootstrap;
pub mod chain;
pub mod config;
pub mod error;
pub mod filter;
pub mod proxy;

// Re-export commonly used types
pub use chain::{ChainResolution, HopCredentials, ProxyChain, ProxyHop};
pub use config::{ServerConfig, TlsPaths, User};
pub use error::{ProxyError, Result, ValidationError};
pub use filter::{FilterMode, IpAccessFilter};
pub use proxy::{ProxyServer, SocksEngine, SocksMethod, UserStore};
