//! Trust root management and leaf certificate synthesis for tlsmint.
//!
//! A [`TrustRoot`] owns the RSA root key, its self-signed CA certificate and
//! a set of Diffie-Hellman parameters, loaded from or persisted to a
//! directory. [`synthesize`] mints leaf certificates under that root. Leaves
//! carry the root's own public key, so the root private key is the only
//! private key a TLS layer ever needs for synthesized certificates.

pub mod dhparam;
pub mod error;
pub mod leaf;
pub mod root;
pub mod serial;

pub use dhparam::DhParams;
pub use error::CertgenError;
pub use leaf::{synthesize, synthesize_with, LeafOptions};
pub use root::{RootOptions, RootPaths, TrustRoot};

/// Default validity of roots and leaves: three years.
pub const DEFAULT_VALIDITY: time::Duration = time::Duration::seconds(94_608_000);

/// How far `not_before` is backdated to tolerate client clock skew.
pub const CLOCK_SKEW: time::Duration = time::Duration::hours(48);
