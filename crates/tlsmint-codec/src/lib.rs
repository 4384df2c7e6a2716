//! Certificate codecs for tlsmint.
//!
//! This crate turns PEM or DER input into an immutable [`Certificate`]
//! whose identity is the SHA-256 digest of its DER encoding, extracts the
//! fields the certificate store matches on (common name and DNS/IP
//! subject alternative names), and handles PEM-encoded private keys.

pub mod certificate;
pub mod error;
pub mod key;
mod san;

pub use certificate::{Certificate, Digest, KeyInfo, NameComponent};
pub use error::DecodeError;
pub use key::PrivateKey;
