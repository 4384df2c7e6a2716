//! Cached certificate entries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::CertificateDer;
use tlsmint_codec::{Certificate, PrivateKey};

/// How an entry entered the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    Synthesized,
    Static,
}

/// A certificate together with the key and chain a TLS layer presents it with.
///
/// Entries compare equal when their certificates do.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    certificate: Certificate,
    private_key: Arc<PrivateKey>,
    chain_file: Option<PathBuf>,
    chain: Vec<CertificateDer<'static>>,
    origin: EntryOrigin,
}

impl CacheEntry {
    /// A statically provided certificate with no intermediates.
    pub fn new(
        certificate: Certificate,
        private_key: Arc<PrivateKey>,
        chain_file: Option<PathBuf>,
    ) -> Self {
        Self {
            certificate,
            private_key,
            chain_file,
            chain: Vec::new(),
            origin: EntryOrigin::Static,
        }
    }

    pub(crate) fn synthesized(
        certificate: Certificate,
        private_key: Arc<PrivateKey>,
        chain_file: Option<PathBuf>,
        chain: Vec<CertificateDer<'static>>,
    ) -> Self {
        Self {
            certificate,
            private_key,
            chain_file,
            chain,
            origin: EntryOrigin::Synthesized,
        }
    }

    /// Certificates presented after the leaf, closest issuer first.
    #[must_use]
    pub fn with_chain(mut self, chain: Vec<CertificateDer<'static>>) -> Self {
        self.chain = chain;
        self
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn private_key(&self) -> &Arc<PrivateKey> {
        &self.private_key
    }

    /// File holding the chain a TLS layer should load alongside the leaf.
    pub fn chain_file(&self) -> Option<&Path> {
        self.chain_file.as_deref()
    }

    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }

    pub fn origin(&self) -> EntryOrigin {
        self.origin
    }
}

impl PartialEq for CacheEntry {
    fn eq(&self, other: &Self) -> bool {
        self.certificate == other.certificate
    }
}

impl Eq for CacheEntry {}
