//! Leaf certificate synthesis.

use std::net::IpAddr;

use rcgen::{CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, SanType};
use time::OffsetDateTime;
use tlsmint_codec::Certificate;
use tracing::debug;

use crate::error::CertgenError;
use crate::root::TrustRoot;
use crate::serial;

/// Common names of this length or longer are left out of the subject.
pub const MAX_COMMON_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct LeafOptions {
    /// Lifetime counted from now; `not_before` is always backdated.
    pub validity: time::Duration,
}

impl Default for LeafOptions {
    fn default() -> Self {
        Self {
            validity: crate::DEFAULT_VALIDITY,
        }
    }
}

/// Synthesize a leaf for `common_name` and `sans` under `root` with default options.
pub fn synthesize(
    root: &TrustRoot,
    common_name: Option<&[u8]>,
    sans: &[Vec<u8>],
) -> Result<Certificate, CertgenError> {
    synthesize_with(root, common_name, sans, &LeafOptions::default())
}

/// Synthesize a leaf certificate signed by `root`.
///
/// The leaf carries the root's public key. Each SAN becomes an IP entry when
/// it parses as an IP literal and a DNS entry otherwise. Names must be plain
/// ASCII (IDNA-encoded by the caller).
pub fn synthesize_with(
    root: &TrustRoot,
    common_name: Option<&[u8]>,
    sans: &[Vec<u8>],
    options: &LeafOptions,
) -> Result<Certificate, CertgenError> {
    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params.subject_alt_names = sans
        .iter()
        .map(|san| san_entry(san))
        .collect::<Result<Vec<_>, _>>()?;

    let now = OffsetDateTime::now_utc();
    params.not_before = now - crate::CLOCK_SKEW;
    params.not_after = now + options.validity;

    if let Some(common_name) = common_name {
        let common_name = ascii_name(common_name, "common name")?;
        if common_name.len() < MAX_COMMON_NAME_LEN {
            params
                .distinguished_name
                .push(DnType::CommonName, common_name);
        }
    }

    params.serial_number = Some(serial::to_serial_number(serial::next_leaf_serial()));
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.use_authority_key_identifier_extension = true;

    let cert = params
        .signed_by(root.public_key(), root.issuer())
        .map_err(|e| CertgenError::Generation(e.to_string()))?;
    let certificate = Certificate::from_der(cert.der().to_vec())?;
    debug!(
        common_name = ?common_name.map(String::from_utf8_lossy),
        sans = sans.len(),
        fingerprint = %certificate.fingerprint(),
        "synthesized leaf certificate"
    );
    Ok(certificate)
}

fn san_entry(raw: &[u8]) -> Result<SanType, CertgenError> {
    let name = ascii_name(raw, "subject alternative name")?;
    if let Ok(ip) = name.parse::<IpAddr>() {
        return Ok(SanType::IpAddress(ip));
    }
    let dns = name
        .try_into()
        .map_err(|e: rcgen::Error| CertgenError::InvalidIdentity(format!("{name:?}: {e}")))?;
    Ok(SanType::DnsName(dns))
}

fn ascii_name<'a>(raw: &'a [u8], what: &str) -> Result<&'a str, CertgenError> {
    if !raw.is_ascii() {
        return Err(CertgenError::InvalidIdentity(format!(
            "{what} {:?} is not plain ASCII",
            String::from_utf8_lossy(raw)
        )));
    }
    std::str::from_utf8(raw).map_err(|e| CertgenError::InvalidIdentity(e.to_string()))
}
