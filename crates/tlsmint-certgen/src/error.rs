//! Certificate generation errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertgenError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("certificate generation failed: {0}")]
    Generation(String),

    #[error("key material error: {0}")]
    KeyMaterial(#[from] openssl::error::ErrorStack),

    #[error("root key does not match root certificate in {}", .0.display())]
    KeyMismatch(PathBuf),

    #[error(transparent)]
    Decode(#[from] tlsmint_codec::DecodeError),
}

impl CertgenError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
