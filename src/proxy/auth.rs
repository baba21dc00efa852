//! Username/password verification for the SOCKS5 handshake

use std::collections::HashMap;

/// In-memory credential store backing RFC 1929 authentication
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStore {
    users: HashMap<String, String>,
}

impl UserStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Register a user. Re-registering a username replaces its password.
    pub fn add_user(&mut self, username: &str, password: &str) {
        self.users
            .insert(username.to_string(), password.to_string());
    }

    /// Check a credential pair against the store
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.users.get(username).map(String::as_str) == Some(password)
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }
}
