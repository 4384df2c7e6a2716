//! rustls integration.

use std::sync::Arc;

use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use tracing::warn;

use crate::entry::CacheEntry;
use crate::error::StoreError;
use crate::identity::Identity;
use crate::store::CertStore;

/// Serves certificates from a [`CertStore`] by SNI.
///
/// Handshakes without SNI get whatever the store answers for an anonymous
/// identity: the catch-all `*` registration if present, a nameless leaf
/// otherwise.
#[derive(Debug, Clone)]
pub struct StoreResolver {
    store: Arc<CertStore>,
}

impl StoreResolver {
    pub fn new(store: Arc<CertStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CertStore> {
        &self.store
    }

    /// The key rustls should present for `server_name`.
    pub fn certified_key(
        &self,
        server_name: Option<&str>,
    ) -> Result<Arc<CertifiedKey>, StoreError> {
        let identity = server_name.map_or_else(Identity::anonymous, Identity::for_host);
        let entry = self.store.lookup(&identity)?;
        certified_key(&entry)
    }
}

impl ResolvesServerCert for StoreResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let server_name = client_hello.server_name();
        match self.certified_key(server_name) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(server_name = ?server_name, error = %e, "no certificate for handshake");
                None
            }
        }
    }
}

/// Build the rustls view of `entry`: leaf, then its chain, with its signing key.
pub fn certified_key(entry: &CacheEntry) -> Result<Arc<CertifiedKey>, StoreError> {
    let signing_key = rustls::crypto::ring::sign::any_supported_type(entry.private_key().der())
        .map_err(|e| StoreError::Tls(e.to_string()))?;
    let mut chain = Vec::with_capacity(entry.chain().len() + 1);
    chain.push(entry.certificate().der().clone());
    chain.extend(entry.chain().iter().cloned());
    Ok(Arc::new(CertifiedKey::new(chain, signing_key)))
}
