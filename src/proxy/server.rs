//! SOCKS5 server engine built on fast-socks5

use crate::chain::ProxyChain;
use crate::config::ServerConfig;
use crate::error::{ProxyError, Result};
use crate::filter::IpAccessFilter;
use crate::proxy::auth::UserStore;
use crate::proxy::engine::{session_permitted, SocksEngine, SocksMethod};
use crate::proxy::tls::build_acceptor;
use crate::proxy::upstream::{connect_via_chain, UpstreamStream};
use async_trait::async_trait;
use fast_socks5::server::{run_tcp_proxy, Socks5ServerProtocol};
use fast_socks5::util::target_addr::TargetAddr;
use fast_socks5::{ReplyError, Socks5Command, SocksError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// How the handshake authenticates clients, fixed at startup from the
/// advertised method list
#[derive(Debug, Clone)]
enum AuthPolicy {
    Anonymous,
    Password(UserStore),
}

impl AuthPolicy {
    /// Anonymous access takes precedence when advertised, since
    /// password verification adds nothing once any client may skip it
    fn from_methods(methods: &[SocksMethod]) -> Self {
        if methods.contains(&SocksMethod::NoAuth) {
            return Self::Anonymous;
        }
        for method in methods {
            if let SocksMethod::UserPassword(store) = method {
                return Self::Password(store.clone());
            }
        }
        // No methods advertised at all, nobody can authenticate
        Self::Password(UserStore::new())
    }
}

/// Per-session state shared by all connection tasks
struct SessionContext {
    auth: AuthPolicy,
    filters: Vec<IpAccessFilter>,
    chain: Option<ProxyChain>,
    buffer_size: usize,
    timeout: Duration,
}

/// SOCKS5 proxy server, programmed through [`SocksEngine`] and run
/// with [`SocksEngine::start`]
pub struct ProxyServer {
    config: ServerConfig,
    methods: Vec<SocksMethod>,
    filters: Vec<IpAccessFilter>,
    chain: Option<ProxyChain>,
}

impl ProxyServer {
    /// Create a server from the listener/limit portion of the config.
    /// Methods, filters and the chain are programmed afterwards.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            config: config.clone(),
            methods: Vec::new(),
            filters: Vec::new(),
            chain: None,
        }
    }
}

#[async_trait]
impl SocksEngine for ProxyServer {
    fn set_supported_methods(&mut self, methods: Vec<SocksMethod>) {
        self.methods = methods;
    }

    fn add_session_filter(&mut self, filter: IpAccessFilter) {
        self.filters.push(filter);
    }

    fn set_proxy(&mut self, chain: ProxyChain) {
        self.chain = Some(chain);
    }

    async fn start(&mut self, port: u16) -> Result<()> {
        let acceptor = self.config.tls.as_ref().map(build_acceptor).transpose()?;

        let addr = SocketAddr::new(self.config.listen_ip, port);
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                ProxyError::PortInUse { port }
            } else {
                ProxyError::Bind { port, source: e }
            }
        })?;

        info!("SOCKS5 server listening on {}", addr);
        if self.chain.is_some() {
            info!(
                "Forwarding outbound connections through {} upstream hop(s)",
                self.chain.as_ref().map(ProxyChain::len).unwrap_or(0)
            );
        }

        let ctx = Arc::new(SessionContext {
            auth: AuthPolicy::from_methods(&self.methods),
            filters: self.filters.clone(),
            chain: self.chain.clone(),
            buffer_size: self.config.buffer_size,
            timeout: self.config.timeout,
        });
        let limit = Arc::new(Semaphore::new(self.config.max_connections));

        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            // Past the session cap, excess connections are closed
            // immediately rather than queued for a free slot. Dropping
            // the un-permitted socket closes it.
            let Ok(permit) = limit.clone().try_acquire_owned() else {
                warn!("Connection limit reached, rejecting {}", peer);
                continue;
            };

            if !session_permitted(&ctx.filters, peer.ip()) {
                debug!("Session filter rejected {}", peer);
                continue;
            }

            let ctx = ctx.clone();
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let outcome = match acceptor {
                    Some(tls) => match tls.accept(socket).await {
                        Ok(stream) => serve_session(stream, peer, ctx).await,
                        Err(e) => {
                            debug!("TLS handshake with {} failed: {}", peer, e);
                            return;
                        }
                    },
                    None => serve_session(socket, peer, ctx).await,
                };
                if let Err(e) = outcome {
                    debug!("Session with {} ended with error: {}", peer, e);
                }
            });
        }
    }
}

/// Run the SOCKS5 handshake and command on one accepted stream
async fn serve_session<T>(
    stream: T,
    peer: SocketAddr,
    ctx: Arc<SessionContext>,
) -> std::result::Result<(), SocksError>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let proto = match &ctx.auth {
        AuthPolicy::Anonymous => Socks5ServerProtocol::accept_no_auth(stream).await?,
        AuthPolicy::Password(store) => {
            let store = store.clone();
            Socks5ServerProtocol::accept_password_auth(stream, move |user, password| {
                store.verify(&user, &password)
            })
            .await?
            .0
        }
    };

    let (proto, cmd, target) = proto.read_command().await?;
    match cmd {
        Socks5Command::TCPConnect => {}
        _ => {
            proto.reply_error(&ReplyError::CommandNotSupported).await?;
            return Ok(());
        }
    }

    debug!("{} requested CONNECT to {:?}", peer, target);

    match &ctx.chain {
        None => {
            run_tcp_proxy(proto, &target, ctx.timeout, false).await?;
        }
        Some(chain) => {
            let (host, port) = target_parts(&target);
            match connect_via_chain(chain, &host, port, ctx.timeout).await {
                Ok(outbound) => {
                    let reply_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
                    let inner = proto.reply_success(reply_addr).await?;
                    relay(inner, outbound, ctx.buffer_size, ctx.timeout).await;
                }
                Err(e) => {
                    warn!("Chain dial for {:?} failed: {}", target, e);
                    proto.reply_error(&ReplyError::HostUnreachable).await?;
                }
            }
        }
    }

    Ok(())
}

fn target_parts(target: &TargetAddr) -> (String, u16) {
    match target {
        TargetAddr::Ip(addr) => (addr.ip().to_string(), addr.port()),
        TargetAddr::Domain(domain, port) => (domain.clone(), *port),
    }
}

/// Shuttle bytes between the client and the chained upstream until one
/// side closes or the link stays idle past the timeout
async fn relay<T>(mut client: T, mut upstream: UpstreamStream, buffer_size: usize, idle: Duration)
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut client_buf = vec![0u8; buffer_size];
    let mut upstream_buf = vec![0u8; buffer_size];

    loop {
        let idle_timer = tokio::time::sleep(idle);
        tokio::select! {
            read = client.read(&mut client_buf) => {
                match read {
                    Ok(0) => break,
                    Ok(n) => {
                        if upstream.write_all(&client_buf[..n]).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Client read error: {}", e);
                        break;
                    }
                }
            }
            read = upstream.read(&mut upstream_buf) => {
                match read {
                    Ok(0) => break,
                    Ok(n) => {
                        if client.write_all(&upstream_buf[..n]).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Upstream read error: {}", e);
                        break;
                    }
                }
            }
            _ = idle_timer => {
                debug!("Relay idle for {:?}, closing", idle);
                break;
            }
        }
    }

    let _ = client.shutdown().await;
    let _ = upstream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;

    #[test]
    fn test_auth_policy_prefers_anonymous() {
        let mut store = UserStore::new();
        store.add_user("alice", "pw");
        let methods = vec![SocksMethod::NoAuth, SocksMethod::UserPassword(store)];

        assert!(matches!(
            AuthPolicy::from_methods(&methods),
            AuthPolicy::Anonymous
        ));
    }

    #[test]
    fn test_auth_policy_password_only() {
        let mut store = UserStore::new();
        store.add_user("alice", "pw");
        let methods = vec![SocksMethod::UserPassword(store)];

        let AuthPolicy::Password(store) = AuthPolicy::from_methods(&methods) else {
            panic!("expected password policy");
        };
        assert!(store.verify("alice", "pw"));
    }

    #[test]
    fn test_auth_policy_no_methods_rejects_all() {
        let AuthPolicy::Password(store) = AuthPolicy::from_methods(&[]) else {
            panic!("expected password policy");
        };
        assert!(store.is_empty());
    }

    #[test]
    fn test_engine_accumulates_programming() {
        let config = ServerConfig::default();
        let mut server = ProxyServer::new(&config);

        server.set_supported_methods(vec![SocksMethod::NoAuth]);
        server.add_session_filter(
            IpAccessFilter::parse("10.0.0.1", FilterMode::DenyList).unwrap(),
        );
        server.add_session_filter(
            IpAccessFilter::parse("10.0.0.2", FilterMode::DenyList).unwrap(),
        );

        assert_eq!(server.methods, vec![SocksMethod::NoAuth]);
        assert_eq!(server.filters.len(), 2);
        assert!(server.chain.is_none());
    }
}
