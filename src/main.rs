use anyhow::anyhow;
use clap::Parser;
use esocks::{
    bootstrap, chain, config, ChainResolution, FilterMode, IpAccessFilter, ProxyError,
    ProxyServer, ServerConfig, TlsPaths,
};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "esocks")]
#[command(about = "Forward SOCKS5 proxy with upstream chaining and IP session filtering")]
struct Args {
    /// Port to listen on
    #[arg(long, short = 'p', default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Address to bind the listener to
    #[arg(long, short = 'l', default_value = "0.0.0.0")]
    listen_ip: IpAddr,

    /// Register users as username:password, comma separated
    #[arg(long = "user", short = 'u', value_delimiter = ',')]
    users: Vec<String>,

    /// Allow clients without credentials (defaults to true when no
    /// users are registered)
    #[arg(long = "none-auth", overrides_with = "none_auth")]
    none_auth: Option<bool>,

    /// Maximum number of concurrent client sessions
    #[arg(long = "max-connection", default_value_t = config::DEFAULT_MAX_CONNECTIONS)]
    max_connection: usize,

    /// Relay buffer size in bytes
    #[arg(long = "buffer-size", default_value_t = config::DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Connect and idle timeout in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_MS)]
    timeout: u64,

    /// Admit only these peers: IPs or lo-hi ranges, comma separated
    #[arg(long = "white-list")]
    white_list: Vec<String>,

    /// Reject these peers: IPs or lo-hi ranges, comma separated
    #[arg(long = "black-list")]
    black_list: Vec<String>,

    /// Upstream proxy chain: host,port[,user,password] hops joined by ->
    #[arg(long = "proxy", short = 'P')]
    proxy: Option<String>,

    /// PEM certificate chain for TLS-wrapped sessions
    #[arg(long = "cert-file")]
    cert_file: Option<PathBuf>,

    /// PEM private key for TLS-wrapped sessions
    #[arg(long = "key-file")]
    key_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn build_config(args: Args) -> Result<ServerConfig, ProxyError> {
    let mut users = Vec::with_capacity(args.users.len());
    for entry in &args.users {
        users.push(config::parse_user(entry)?);
    }

    let mut filters = Vec::new();
    for spec in &args.white_list {
        filters.push(IpAccessFilter::parse(spec, FilterMode::AllowList)?);
    }
    for spec in &args.black_list {
        filters.push(IpAccessFilter::parse(spec, FilterMode::DenyList)?);
    }

    let chain = match args.proxy.as_deref().map(chain::resolve) {
        None | Some(ChainResolution::Empty) => None,
        Some(ChainResolution::Resolved(chain)) => Some(chain),
        Some(ChainResolution::Partial { failures, .. }) => {
            let failures = failures
                .iter()
                .map(|f| format!("{} ({})", f.token, f.error))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ProxyError::ChainResolution { failures });
        }
    };

    let tls = match (args.cert_file, args.key_file) {
        (Some(cert_file), Some(key_file)) => Some(TlsPaths {
            cert_file,
            key_file,
        }),
        (None, None) => None,
        _ => return Err(esocks::ValidationError::TlsPairing.into()),
    };

    Ok(ServerConfig {
        listen_ip: args.listen_ip,
        port: args.port,
        max_connections: args.max_connection,
        buffer_size: args.buffer_size,
        timeout: Duration::from_millis(args.timeout),
        users,
        filters,
        chain,
        tls,
        none_auth: args.none_auth,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let env_filter = if args.verbose {
        EnvFilter::from_default_env()
            .add_directive(tracing_subscriber::filter::LevelFilter::DEBUG.into())
    } else {
        EnvFilter::from_default_env()
            .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(args)?;

    if config.tls.is_some() {
        rustls::crypto::ring::default_provider()
            .install_default()
            .map_err(|_| anyhow!("failed to install TLS crypto provider"))?;
    }

    let mut server = ProxyServer::new(&config);
    bootstrap::run(&mut server, &config).await?;
    Ok(())
}
