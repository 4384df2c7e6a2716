//! Config loading and store bring-up.

use std::path::PathBuf;
use std::sync::Arc;

use tlsmint_certgen::TrustRoot;
use tracing::info;

use crate::config::Config;
use crate::error::StoreError;
use crate::store::CertStore;

/// Load configuration from the given path, or the default location.
pub fn load_config(path: Option<&str>) -> Result<Config, StoreError> {
    let config_path = match path {
        Some(p) => PathBuf::from(p),
        None => default_config_path(),
    };

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| StoreError::Config(format!("failed to read config: {e}")))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| StoreError::Config(format!("failed to parse config: {e}")))?;
        info!(path = %config_path.display(), "loaded config");
        Ok(config)
    } else {
        info!("no config file found, using defaults");
        Ok(Config::default())
    }
}

/// Load or create the trust root and register the configured certificates.
///
/// The returned store is fully initialized; nothing is created lazily later.
pub fn open_store(config: &Config) -> Result<CertStore, StoreError> {
    let root = TrustRoot::load_or_create_with(
        &config.store.directory,
        &config.store.label,
        &config.root.to_options(),
    )?;
    let store = CertStore::with_options(Arc::new(root), config.store_options());
    for cert in &config.certs {
        store.add_cert_file(&cert.name, &cert.path)?;
    }
    info!(
        directory = %config.store.directory.display(),
        capacity = config.store.capacity,
        static_certs = config.certs.len(),
        "certificate store ready"
    );
    Ok(store)
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("tlsmint")
}

fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}
