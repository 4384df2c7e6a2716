//! Immutable X.509 certificate wrapper.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustls::pki_types::CertificateDer;
use time::OffsetDateTime;
use x509_parser::public_key::PublicKey;
use x509_parser::x509::X509Name;

use crate::error::DecodeError;
use crate::san;

const COMMON_NAME_OID: &str = "2.5.4.3";

/// SHA-256 digest of a certificate's DER encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Digest the given DER bytes.
    pub fn of(der: &[u8]) -> Self {
        let digest = ring::digest::digest(&ring::digest::SHA256, der);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(digest.as_ref());
        Self(bytes)
    }

    /// Colon-separated form, e.g. `SHA256:3f:a0:...`.
    pub fn fingerprint(&self) -> String {
        use std::fmt::Write;
        let mut fingerprint = String::from("SHA256:");
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                fingerprint.push(':');
            }
            let _ = write!(fingerprint, "{byte:02x}");
        }
        fingerprint
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

/// One attribute of a subject or issuer name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameComponent {
    /// Short attribute name (`CN`, `O`, ...) or the dotted OID when unknown.
    pub short_name: String,
    /// Raw attribute value bytes.
    pub value: Vec<u8>,
}

/// Public key algorithm and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    pub algorithm: &'static str,
    pub bits: usize,
}

/// A parsed certificate.
///
/// Equality and hashing use the SHA-256 digest of the DER encoding only.
#[derive(Clone)]
pub struct Certificate {
    der: CertificateDer<'static>,
    digest: Digest,
    common_name: Option<Vec<u8>>,
    alt_names: Vec<Vec<u8>>,
    subject: Vec<NameComponent>,
    issuer: Vec<NameComponent>,
    serial: Vec<u8>,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    key_info: KeyInfo,
    public_key_der: Vec<u8>,
}

impl Certificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, DecodeError> {
        let der: Vec<u8> = der.into();
        let (_, parsed) = x509_parser::parse_x509_certificate(&der)
            .map_err(|e| DecodeError::X509(e.to_string()))?;

        let subject = name_components(parsed.subject());
        let issuer = name_components(parsed.issuer());
        let common_name = last_common_name(&subject);
        let alt_names = san::alt_names(&parsed);
        let serial = parsed.raw_serial().to_vec();
        let not_before = parsed.validity().not_before.to_datetime();
        let not_after = parsed.validity().not_after.to_datetime();

        let spki = parsed.public_key();
        let key_info = match spki.parsed() {
            Ok(PublicKey::RSA(rsa)) => KeyInfo {
                algorithm: "RSA",
                bits: rsa.key_size(),
            },
            Ok(PublicKey::EC(point)) => KeyInfo {
                algorithm: "EC",
                bits: point.key_size(),
            },
            Ok(PublicKey::DSA(_)) => KeyInfo {
                algorithm: "DSA",
                bits: 0,
            },
            _ => KeyInfo {
                algorithm: "UNKNOWN",
                bits: 0,
            },
        };
        let public_key_der = spki.raw.to_vec();

        Ok(Self {
            digest: Digest::of(&der),
            der: CertificateDer::from(der),
            common_name,
            alt_names,
            subject,
            issuer,
            serial,
            not_before,
            not_after,
            key_info,
            public_key_der,
        })
    }

    /// Parse the first certificate found in PEM input.
    ///
    /// Blocks after the first certificate are not examined.
    pub fn from_pem(pem: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = std::io::BufReader::new(pem);
        let der = rustls_pemfile::certs(&mut reader)
            .next()
            .ok_or(DecodeError::NoCertificate)?
            .map_err(|e| DecodeError::Pem(e.to_string()))?;
        Self::from_der(der.to_vec())
    }

    /// Parse every certificate found in PEM input, in order.
    pub fn all_from_pem(pem: &[u8]) -> Result<Vec<Self>, DecodeError> {
        let mut reader = std::io::BufReader::new(pem);
        let ders: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DecodeError::Pem(e.to_string()))?;
        if ders.is_empty() {
            return Err(DecodeError::NoCertificate);
        }
        ders.into_iter()
            .map(|der| Self::from_der(der.to_vec()))
            .collect()
    }

    /// PEM encoding with `\n` line endings.
    pub fn to_pem(&self) -> String {
        let block = pem::Pem::new("CERTIFICATE", self.der.to_vec());
        pem::encode_config(
            &block,
            pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
        )
    }

    pub fn der(&self) -> &CertificateDer<'static> {
        &self.der
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    pub fn fingerprint(&self) -> String {
        self.digest.fingerprint()
    }

    /// Value of the last `CN` attribute of the subject, if any.
    pub fn common_name(&self) -> Option<&[u8]> {
        self.common_name.as_deref()
    }

    /// DNS and IP subject alternative names, in certificate order.
    pub fn alt_names(&self) -> &[Vec<u8>] {
        &self.alt_names
    }

    pub fn subject(&self) -> &[NameComponent] {
        &self.subject
    }

    pub fn issuer(&self) -> &[NameComponent] {
        &self.issuer
    }

    /// Big-endian serial number bytes as encoded in the certificate.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    pub fn not_before(&self) -> OffsetDateTime {
        self.not_before
    }

    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }

    /// Whether `not_after` lies in the past.
    pub fn has_expired(&self) -> bool {
        self.not_after < OffsetDateTime::now_utc()
    }

    pub fn key_info(&self) -> KeyInfo {
        self.key_info
    }

    /// DER-encoded SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.digest.hash(state);
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field(
                "common_name",
                &self.common_name.as_deref().map(String::from_utf8_lossy),
            )
            .field(
                "alt_names",
                &self
                    .alt_names
                    .iter()
                    .map(|name| String::from_utf8_lossy(name))
                    .collect::<Vec<_>>(),
            )
            .field("not_after", &self.not_after)
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

fn name_components(name: &X509Name<'_>) -> Vec<NameComponent> {
    name.iter()
        .flat_map(|rdn| rdn.iter())
        .map(|attribute| {
            let oid = attribute.attr_type().to_id_string();
            NameComponent {
                short_name: short_name(&oid).map_or(oid.clone(), str::to_string),
                value: attribute.attr_value().data.to_vec(),
            }
        })
        .collect()
}

fn short_name(oid: &str) -> Option<&'static str> {
    match oid {
        COMMON_NAME_OID => Some("CN"),
        "2.5.4.6" => Some("C"),
        "2.5.4.7" => Some("L"),
        "2.5.4.8" => Some("ST"),
        "2.5.4.10" => Some("O"),
        "2.5.4.11" => Some("OU"),
        "1.2.840.113549.1.9.1" => Some("emailAddress"),
        _ => None,
    }
}

/// Later `CN` attributes override earlier ones.
fn last_common_name(components: &[NameComponent]) -> Option<Vec<u8>> {
    components
        .iter()
        .filter(|component| component.short_name == "CN")
        .last()
        .map(|component| component.value.clone())
}
