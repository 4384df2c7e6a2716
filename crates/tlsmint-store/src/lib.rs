//! Certificate cache for tlsmint.
//!
//! [`CertStore`] answers "which certificate should this handshake present?"
//! for a requested common name and subject alternative names. Lookups try
//! statically registered certificates and previously synthesized leaves via
//! exact and asterisk-form keys, and fall back to synthesizing a new leaf
//! under the [`TrustRoot`](tlsmint_certgen::TrustRoot). The cache is bounded
//! and safe to share between threads.

pub mod config;
pub mod entry;
pub mod error;
pub mod identity;
pub mod registry;
pub mod resolver;
pub mod setup;
pub mod store;

pub use config::Config;
pub use entry::{CacheEntry, EntryOrigin};
pub use error::StoreError;
pub use identity::{asterisk_forms, Identity, IdentityKey};
pub use resolver::StoreResolver;
pub use store::{CertStore, StoreOptions, StoreStats, STORE_CAP};
