//! TLS acceptor built from PEM certificate and key files

use crate::config::TlsPaths;
use crate::error::{ProxyError, Result};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

/// Load the certificate chain and private key and build an acceptor
/// for wrapping inbound sessions
pub fn build_acceptor(paths: &TlsPaths) -> Result<TlsAcceptor> {
    let cert_file = File::open(&paths.cert_file)?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ProxyError::Tls(format!("failed to read certificates: {}", e)))?;
    if certs.is_empty() {
        return Err(ProxyError::Tls(format!(
            "no certificates found in {}",
            paths.cert_file.display()
        )));
    }

    let key_file = File::open(&paths.key_file)?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .map_err(|e| ProxyError::Tls(format!("failed to read private key: {}", e)))?
        .ok_or_else(|| {
            ProxyError::Tls(format!(
                "no private key found in {}",
                paths.key_file.display()
            ))
        })?;

    let config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ProxyError::Tls(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_files_reported() {
        let paths = TlsPaths {
            cert_file: PathBuf::from("/nonexistent/cert.pem"),
            key_file: PathBuf::from("/nonexistent/key.pem"),
        };

        assert!(build_acceptor(&paths).is_err());
    }
}
