//! Decoding errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no certificate found in PEM input")]
    NoCertificate,

    #[error("no private key found in PEM input")]
    NoPrivateKey,

    #[error("malformed PEM: {0}")]
    Pem(String),

    #[error("malformed X.509 certificate: {0}")]
    X509(String),
}
