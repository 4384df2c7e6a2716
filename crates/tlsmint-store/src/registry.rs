//! Statically provided certificates.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tlsmint_codec::{Certificate, PrivateKey};
use tracing::{info, warn};

use crate::entry::CacheEntry;
use crate::error::StoreError;
use crate::identity::IdentityKey;
use crate::store::CertStore;

impl CertStore {
    /// Register a pre-made certificate.
    ///
    /// The entry is stored under its own common name (when non-empty), each of
    /// its SANs, and every name in `extra_names`. It counts once towards the
    /// capacity and is evicted like any other entry.
    pub fn register_static<I, N>(&self, entry: CacheEntry, extra_names: I) -> Arc<CacheEntry>
    where
        I: IntoIterator<Item = N>,
        N: Into<Vec<u8>>,
    {
        let certificate = entry.certificate();
        let mut keys: Vec<IdentityKey> = Vec::new();
        if let Some(common_name) = certificate.common_name().filter(|cn| !cn.is_empty()) {
            keys.push(IdentityKey::name(common_name));
        }
        keys.extend(certificate.alt_names().iter().cloned().map(IdentityKey::Name));
        keys.extend(extra_names.into_iter().map(IdentityKey::name));

        let entry = Arc::new(entry);
        self.insert_all(keys, Arc::clone(&entry));
        entry
    }

    /// Register the certificate in the PEM file at `path` under `name`.
    ///
    /// The first certificate in the file is the leaf; any that follow form its
    /// chain. The private key is read from the same file. When it is missing or
    /// unreadable the root private key is used instead, with a warning. A
    /// non-ASCII `name` is stored in its IDNA (punycode) form.
    pub fn add_cert_file(&self, name: &str, path: &Path) -> Result<Arc<CacheEntry>, StoreError> {
        let name = ascii_name(name)?;
        let registration = |reason: String| StoreError::Registration {
            path: path.to_path_buf(),
            reason,
        };

        let raw = fs::read(path).map_err(|e| registration(e.to_string()))?;
        let certificate = Certificate::from_pem(&raw).map_err(|e| registration(e.to_string()))?;
        let chain = match Certificate::all_from_pem(&raw) {
            Ok(all) => all.iter().skip(1).map(|c| c.der().clone()).collect(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable chain certificates");
                Vec::new()
            }
        };
        let private_key = match PrivateKey::from_pem(&raw)
            .map_err(|e| e.to_string())
            .and_then(usable_key)
        {
            Ok(key) => Arc::new(key),
            Err(reason) => {
                warn!(
                    path = %path.display(),
                    error = %reason,
                    "no usable private key in certificate file, using the root key"
                );
                Arc::clone(self.root().private_key())
            }
        };

        let entry = CacheEntry::new(certificate, private_key, Some(path.to_path_buf()))
            .with_chain(chain);
        let entry = self.register_static(entry, [name.as_str()]);
        info!(
            name = %name,
            path = %path.display(),
            fingerprint = %entry.certificate().fingerprint(),
            "registered static certificate"
        );
        Ok(entry)
    }
}

/// Keep `key` only if rustls can sign with it.
fn usable_key(key: PrivateKey) -> Result<PrivateKey, String> {
    rustls::crypto::ring::sign::any_supported_type(key.der())
        .map(|_| key)
        .map_err(|e| e.to_string())
}

fn ascii_name(name: &str) -> Result<String, StoreError> {
    if name.is_ascii() {
        return Ok(name.to_string());
    }
    idna::domain_to_ascii(name).map_err(|e| {
        StoreError::InvalidIdentity(format!("certificate name {name:?} has no IDNA form: {e:?}"))
    })
}
