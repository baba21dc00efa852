//! Wiring of a validated configuration into a SOCKS5 engine

use crate::config::ServerConfig;
use crate::error::Result;
use crate::proxy::auth::UserStore;
use crate::proxy::engine::{SocksEngine, SocksMethod};

/// Program an engine from the configuration without starting it.
///
/// Anonymous access advertises no-auth, registered users advertise
/// username/password, and both may be advertised together. Later
/// duplicate usernames replace earlier ones in the store. A config
/// with anonymous access disabled and no users yields an empty method
/// list, which locks every client out.
pub fn configure<E: SocksEngine>(engine: &mut E, config: &ServerConfig) {
    let mut store = UserStore::new();
    for user in &config.users {
        store.add_user(&user.username, &user.password);
    }

    let mut methods = Vec::new();
    if config.anonymous_enabled() {
        methods.push(SocksMethod::NoAuth);
    }
    if !store.is_empty() {
        methods.push(SocksMethod::UserPassword(store));
    }
    engine.set_supported_methods(methods);

    for filter in &config.filters {
        engine.add_session_filter(filter.clone());
    }

    if let Some(chain) = &config.chain {
        engine.set_proxy(chain.clone());
    }
}

/// Program the engine and serve on the configured port
pub async fn run<E: SocksEngine>(engine: &mut E, config: &ServerConfig) -> Result<()> {
    configure(engine, config);
    engine.start(config.port).await
}
