//! Upstream proxy chain resolution
//!
//! A chain specification is a `->`-separated list of hop tokens, each
//! token being `host,port` or `host,port,username,password`. Hops are
//! traversed in declaration order when dialing upstream.

use crate::error::ValidationError;
use tracing::warn;

/// Username/password pair forwarded to an upstream hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopCredentials {
    pub username: String,
    pub password: String,
}

/// A single upstream SOCKS5 hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyHop {
    pub host: String,
    pub port: u16,
    pub credentials: Option<HopCredentials>,
}

impl ProxyHop {
    /// Parse one hop token of the form `host,port` or
    /// `host,port,username,password`
    pub fn parse(token: &str) -> Result<Self, ValidationError> {
        let fields: Vec<&str> = token.split(',').map(str::trim).collect();

        let (host, port, credentials) = match fields.as_slice() {
            [host, port] => (*host, *port, None),
            [host, port, username, password] => (
                *host,
                *port,
                Some(HopCredentials {
                    username: (*username).to_string(),
                    password: (*password).to_string(),
                }),
            ),
            _ => {
                return Err(ValidationError::InvalidHop {
                    token: token.to_string(),
                    reason: "expected host,port or host,port,username,password".to_string(),
                })
            }
        };

        if host.is_empty() {
            return Err(ValidationError::InvalidHop {
                token: token.to_string(),
                reason: "host must not be empty".to_string(),
            });
        }

        let port: u16 = port.parse().map_err(|_| ValidationError::InvalidHop {
            token: token.to_string(),
            reason: format!("invalid port '{}'", port),
        })?;
        if port == 0 {
            return Err(ValidationError::InvalidHop {
                token: token.to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }

        Ok(Self {
            host: host.to_string(),
            port,
            credentials,
        })
    }
}

/// Ordered list of upstream hops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyChain {
    hops: Vec<ProxyHop>,
}

impl ProxyChain {
    /// Hops in dialing order: first hop is dialed directly, each later
    /// hop is reached through the previous one
    pub fn hops(&self) -> &[ProxyHop] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}

/// A hop token that failed to parse, with the reason it was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopFailure {
    pub token: String,
    pub error: ValidationError,
}

/// Outcome of resolving a chain specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainResolution {
    /// Every hop token parsed
    Resolved(ProxyChain),
    /// Some tokens were rejected, the chain holds the hops that parsed
    Partial {
        chain: ProxyChain,
        failures: Vec<HopFailure>,
    },
    /// The specification contained no hop tokens
    Empty,
}

/// Resolve a chain specification into an ordered hop list.
///
/// Malformed tokens are skipped rather than aborting resolution, the
/// caller decides whether a partial chain is acceptable.
pub fn resolve(spec: &str) -> ChainResolution {
    let mut hops = Vec::new();
    let mut failures = Vec::new();

    for token in spec.split("->").map(str::trim).filter(|t| !t.is_empty()) {
        match ProxyHop::parse(token) {
            Ok(hop) => hops.push(hop),
            Err(error) => {
                warn!("Skipping malformed proxy hop '{}': {}", token, error);
                failures.push(HopFailure {
                    token: token.to_string(),
                    error,
                });
            }
        }
    }

    if hops.is_empty() && failures.is_empty() {
        return ChainResolution::Empty;
    }

    let chain = ProxyChain { hops };
    if failures.is_empty() {
        ChainResolution::Resolved(chain)
    } else {
        ChainResolution::Partial { chain, failures }
    }
}
