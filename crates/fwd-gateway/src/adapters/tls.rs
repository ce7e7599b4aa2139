//! TLS acceptor construction from PEM files.

use crate::domain::config::TlsConfig;
use crate::domain::error::GatewayError;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>, GatewayError> {
    std::fs::read(path)
        .map_err(|e| GatewayError::Tls(format!("failed to read TLS {what} {}: {e}", path.display())))
}

/// Build a TLS acceptor from the configured certificate chain and key.
pub fn load_tls_acceptor(config: &TlsConfig) -> Result<TlsAcceptor, GatewayError> {
    let cert_pem = read_pem(&config.cert_path, "certificate")?;
    let key_pem = read_pem(&config.key_path, "key")?;

    let certs: Vec<_> = rustls_pemfile::certs(&mut &cert_pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| GatewayError::Tls(format!("failed to parse TLS certificates: {e}")))?;
    if certs.is_empty() {
        return Err(GatewayError::Tls(format!(
            "no certificates found in {}",
            config.cert_path.display()
        )));
    }

    let key = rustls_pemfile::private_key(&mut &key_pem[..])
        .map_err(|e| GatewayError::Tls(format!("failed to parse TLS private key: {e}")))?
        .ok_or_else(|| {
            GatewayError::Tls(format!("no private key found in {}", config.key_path.display()))
        })?;

    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| GatewayError::Tls(format!("invalid TLS configuration: {e}")))?;

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}
