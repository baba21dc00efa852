//! Outbound dialing through an upstream SOCKS5 proxy chain

use crate::chain::{ProxyChain, ProxyHop};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_socks::tcp::Socks5Stream;

/// Stream types a chain leg can be layered over
pub trait UpstreamIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> UpstreamIo for T {}

/// Stream type threaded through the chain. Each SOCKS5 leg wraps the
/// previous one, so the concrete type grows per hop and is erased here.
pub type UpstreamStream = Box<dyn UpstreamIo>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Proxy chain is empty")]
    EmptyChain,

    #[error("Connection to {host}:{port} timed out")]
    ConnectTimeout { host: String, port: u16 },

    #[error("Failed to reach {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("SOCKS5 negotiation for {host}:{port} failed: {source}")]
    Negotiation {
        host: String,
        port: u16,
        source: tokio_socks::Error,
    },
}

/// Dial the target through every hop of the chain in order.
///
/// A TCP connection is opened to the first hop, then each subsequent
/// hop is reached with a CONNECT through the previous one, and the
/// final CONNECT carries the actual target.
pub async fn connect_via_chain(
    chain: &ProxyChain,
    target_host: &str,
    target_port: u16,
    connect_timeout: Duration,
) -> Result<UpstreamStream, UpstreamError> {
    let hops = chain.hops();
    let Some(first) = hops.first() else {
        return Err(UpstreamError::EmptyChain);
    };

    let tcp = timeout(
        connect_timeout,
        TcpStream::connect((first.host.as_str(), first.port)),
    )
    .await
    .map_err(|_| UpstreamError::ConnectTimeout {
        host: first.host.clone(),
        port: first.port,
    })?
    .map_err(|e| UpstreamError::Connect {
        host: first.host.clone(),
        port: first.port,
        source: e,
    })?;

    let mut stream: UpstreamStream = Box::new(tcp);
    for i in 1..hops.len() {
        let via = &hops[i - 1];
        let next = &hops[i];
        stream = connect_leg(stream, via, &next.host, next.port, connect_timeout).await?;
    }

    let last = &hops[hops.len() - 1];
    connect_leg(stream, last, target_host, target_port, connect_timeout).await
}

/// Issue one CONNECT over an established stream, using the credentials
/// of the hop the stream currently terminates at
async fn connect_leg(
    stream: UpstreamStream,
    via: &ProxyHop,
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<UpstreamStream, UpstreamError> {
    let negotiation = async {
        match &via.credentials {
            Some(creds) => {
                Socks5Stream::connect_with_password_and_socket(
                    stream,
                    (host, port),
                    &creds.username,
                    &creds.password,
                )
                .await
            }
            None => Socks5Stream::connect_with_socket(stream, (host, port)).await,
        }
    };

    let connected = timeout(connect_timeout, negotiation)
        .await
        .map_err(|_| UpstreamError::ConnectTimeout {
            host: host.to_string(),
            port,
        })?
        .map_err(|e| UpstreamError::Negotiation {
            host: host.to_string(),
            port,
            source: e,
        })?;

    Ok(Box::new(connected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_boxed_stream_carries_reads_and_writes() {
        let (near, mut far) = duplex(64);
        let mut boxed: UpstreamStream = Box::new(near);

        boxed.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        far.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        far.write_all(b"pong").await.unwrap();
        boxed.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");
    }
}
