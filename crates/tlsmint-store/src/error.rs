//! Certificate store errors.

use std::path::PathBuf;

use thiserror::Error;
use tlsmint_certgen::CertgenError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("failed to register certificate from {}: {reason}", .path.display())]
    Registration { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error(transparent)]
    Certgen(CertgenError),
}

impl From<CertgenError> for StoreError {
    fn from(error: CertgenError) -> Self {
        match error {
            CertgenError::InvalidIdentity(reason) => Self::InvalidIdentity(reason),
            other => Self::Certgen(other),
        }
    }
}
