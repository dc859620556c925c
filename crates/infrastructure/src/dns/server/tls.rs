use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig as TlsServerConfig;
use std::io::BufReader;
use std::sync::Arc;
use warden_dns_domain::DomainError;

/// Load the PEM key pair and build the listener-side TLS configuration
/// (TLS 1.2+ per the rustls defaults).
pub fn load_tls_config(cert_file: &str, key_file: &str) -> Result<Arc<TlsServerConfig>, DomainError> {
    let certs = load_certs(cert_file)?;
    let key = load_key(key_file)?;

    let config = TlsServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| DomainError::InvalidConfig(format!("TLS key pair: {e}")))?;

    Ok(Arc::new(config))
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, DomainError> {
    let file = std::fs::File::open(path)
        .map_err(|e| DomainError::InvalidConfig(format!("cannot read {path}: {e}")))?;
    let certs: Result<Vec<_>, _> = rustls_pemfile::certs(&mut BufReader::new(file)).collect();
    let certs = certs.map_err(|e| DomainError::InvalidConfig(format!("bad cert {path}: {e}")))?;
    if certs.is_empty() {
        return Err(DomainError::InvalidConfig(format!(
            "{path} contains no certificates"
        )));
    }
    Ok(certs)
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>, DomainError> {
    let file = std::fs::File::open(path)
        .map_err(|e| DomainError::InvalidConfig(format!("cannot read {path}: {e}")))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| DomainError::InvalidConfig(format!("bad key {path}: {e}")))?
        .ok_or_else(|| DomainError::InvalidConfig(format!("{path} contains no private key")))
}
