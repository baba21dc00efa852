//! SOCKS5 engine, authentication and upstream dialing

pub mod auth;
pub mod engine;
pub mod server;
pub mod tls;
pub mod upstream;

pub use auth::UserStore;
pub use engine::{session_permitted, SocksEngine, SocksMethod};
pub use server::ProxyServer;
