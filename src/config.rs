//! Server configuration assembled from command-line flags

use crate::chain::ProxyChain;
use crate::error::ValidationError;
use crate::filter::IpAccessFilter;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 1080;
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// A username/password registered with the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
}

/// Parse one `username:password` entry
pub fn parse_user(entry: &str) -> Result<User, ValidationError> {
    let entry = entry.trim();
    let Some((username, password)) = entry.split_once(':') else {
        return Err(ValidationError::InvalidUser {
            entry: entry.to_string(),
        });
    };

    if username.is_empty() {
        return Err(ValidationError::InvalidUser {
            entry: entry.to_string(),
        });
    }

    Ok(User {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// PEM certificate and key used to wrap accepted sessions in TLS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Immutable snapshot of everything the server needs to run
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_ip: IpAddr,
    pub port: u16,
    pub max_connections: usize,
    pub buffer_size: usize,
    pub timeout: Duration,
    pub users: Vec<User>,
    pub filters: Vec<IpAccessFilter>,
    pub chain: Option<ProxyChain>,
    pub tls: Option<TlsPaths>,
    /// Explicit --none-auth value when given, otherwise derived from
    /// whether any users were registered
    pub none_auth: Option<bool>,
}

impl ServerConfig {
    /// Whether clients may connect without credentials.
    ///
    /// An explicit --none-auth flag wins. Absent that, registering at
    /// least one user disables anonymous access.
    pub fn anonymous_enabled(&self) -> bool {
        match self.none_auth {
            Some(explicit) => explicit,
            None => self.users.is_empty(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            users: Vec::new(),
            filters: Vec::new(),
            chain: None,
            tls: None,
            none_auth: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            username: name.to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn test_parse_user_entry() {
        let parsed = parse_user("alice:s3cret").unwrap();

        assert_eq!(parsed.username, "alice");
        assert_eq!(parsed.password, "s3cret");
    }

    #[test]
    fn test_parse_user_password_may_contain_colon() {
        let parsed = parse_user("bob:pa:ss").unwrap();

        assert_eq!(parsed.username, "bob");
        assert_eq!(parsed.password, "pa:ss");
    }

    #[test]
    fn test_parse_user_rejects_malformed() {
        assert!(parse_user("nocolon").is_err());
        assert!(parse_user(":emptyname").is_err());
    }

    #[test]
    fn test_anonymous_default_without_users() {
        let config = ServerConfig::default();

        assert!(config.anonymous_enabled());
    }

    #[test]
    fn test_registering_users_disables_anonymous() {
        let config = ServerConfig {
            users: vec![user("alice")],
            ..Default::default()
        };

        assert!(!config.anonymous_enabled());
    }

    #[test]
    fn test_explicit_none_auth_wins() {
        let enabled = ServerConfig {
            users: vec![user("alice")],
            none_auth: Some(true),
            ..Default::default()
        };
        let disabled = ServerConfig {
            none_auth: Some(false),
            ..Default::default()
        };

        assert!(enabled.anonymous_enabled());
        assert!(!disabled.anonymous_enabled());
    }
}
