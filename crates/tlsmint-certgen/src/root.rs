//! Root signing key and self-signed CA certificate.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::X509;
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose,
};
use time::OffsetDateTime;
use tlsmint_codec::{Certificate, PrivateKey};
use tracing::info;

use crate::dhparam::{DhParams, DEFAULT_DHPARAM};
use crate::error::CertgenError;
use crate::serial;

const ROOT_KEY_BITS: u32 = 2048;

// Microsoft and Netscape purposes kept for older client trust stores.
const MS_CODE_IND: &[u64] = &[1, 3, 6, 1, 4, 1, 311, 2, 1, 21];
const MS_CODE_COM: &[u64] = &[1, 3, 6, 1, 4, 1, 311, 2, 1, 22];
const MS_CTL_SIGN: &[u64] = &[1, 3, 6, 1, 4, 1, 311, 10, 3, 1];
const MS_SGC: &[u64] = &[1, 3, 6, 1, 4, 1, 311, 10, 3, 3];
const MS_EFS: &[u64] = &[1, 3, 6, 1, 4, 1, 311, 10, 3, 4];
const NS_SGC: &[u64] = &[2, 16, 840, 1, 113_730, 4, 1];

const NS_CERT_TYPE: &[u64] = &[2, 16, 840, 1, 113_730, 1, 1];
/// BIT STRING with only `sslCA` (bit 5) set.
const NS_CERT_TYPE_SSL_CA: &[u8] = &[0x03, 0x02, 0x02, 0x04];

/// Files making up a persisted trust root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPaths {
    /// Root certificate followed by its private key.
    pub ca_pem: PathBuf,
    /// Root certificate only.
    pub cert_pem: PathBuf,
    /// Root certificate only, for platforms expecting `.cer`.
    pub cert_cer: PathBuf,
    /// PKCS#12 archive holding the certificate only.
    pub cert_p12: PathBuf,
    /// PKCS#12 archive holding the certificate and private key.
    pub ca_p12: PathBuf,
    pub dhparam: PathBuf,
}

impl RootPaths {
    pub fn new(dir: &Path, label: &str) -> Self {
        Self {
            ca_pem: dir.join(format!("{label}-ca.pem")),
            cert_pem: dir.join(format!("{label}-ca-cert.pem")),
            cert_cer: dir.join(format!("{label}-ca-cert.cer")),
            cert_p12: dir.join(format!("{label}-ca-cert.p12")),
            ca_p12: dir.join(format!("{label}-ca.p12")),
            dhparam: dir.join(format!("{label}-dhparam.pem")),
        }
    }
}

/// Options used when a new root has to be generated.
#[derive(Debug, Clone)]
pub struct RootOptions {
    /// Subject organization; defaults to the label.
    pub organization: Option<String>,
    /// Subject common name; defaults to the label.
    pub common_name: Option<String>,
    pub validity: time::Duration,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            organization: None,
            common_name: None,
            validity: crate::DEFAULT_VALIDITY,
        }
    }
}

/// The root of trust every synthesized leaf chains to.
///
/// Read-only once constructed; share it behind an `Arc`.
pub struct TrustRoot {
    issuer: Issuer<'static, KeyPair>,
    public_key: KeyPair,
    certificate: Certificate,
    private_key: Arc<PrivateKey>,
    dh_params: DhParams,
    ca_path: Option<PathBuf>,
}

impl TrustRoot {
    /// Load the root stored under `dir` for `label`, generating and persisting
    /// it with default options if absent.
    pub fn load_or_create(dir: &Path, label: &str) -> Result<Self, CertgenError> {
        Self::load_or_create_with(dir, label, &RootOptions::default())
    }

    /// Like [`TrustRoot::load_or_create`], with options for a newly generated root.
    pub fn load_or_create_with(
        dir: &Path,
        label: &str,
        options: &RootOptions,
    ) -> Result<Self, CertgenError> {
        let paths = RootPaths::new(dir, label);
        let (certificate, key_pem) = if paths.ca_pem.exists() {
            let loaded = load_material(&paths.ca_pem)?;
            info!(
                path = %paths.ca_pem.display(),
                fingerprint = %loaded.0.fingerprint(),
                "loaded existing trust root"
            );
            loaded
        } else {
            let created = create_store(dir, &paths, label, options)?;
            info!(
                path = %paths.ca_pem.display(),
                fingerprint = %created.0.fingerprint(),
                "generated new trust root"
            );
            created
        };
        let dh_params = DhParams::load_or_write(&paths.dhparam)?;
        Self::assemble(certificate, &key_pem, dh_params, Some(paths.ca_pem))
    }

    /// Generate a root that lives in memory only.
    pub fn ephemeral(label: &str, options: &RootOptions) -> Result<Self, CertgenError> {
        let (certificate, pkey) = generate_root(label, options)?;
        let key_pem = pkcs8_pem(&pkey)?;
        Self::assemble(certificate, &key_pem, DhParams::builtin()?, None)
    }

    /// Build a root from PEM-encoded certificate and private key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, CertgenError> {
        let certificate = Certificate::from_pem(cert_pem)?;
        let key = PrivateKey::from_pem(key_pem)?;
        let pkey = PKey::private_key_from_der(key.secret_der())?;
        ensure_key_matches(&certificate, &pkey, Path::new("<memory>"))?;
        Self::assemble(certificate, &pkcs8_pem(&pkey)?, DhParams::builtin()?, None)
    }

    fn assemble(
        certificate: Certificate,
        key_pem: &str,
        dh_params: DhParams,
        ca_path: Option<PathBuf>,
    ) -> Result<Self, CertgenError> {
        let signing_key = KeyPair::from_pem(key_pem).map_err(generation)?;
        let public_key = KeyPair::from_pem(key_pem).map_err(generation)?;
        let issuer = Issuer::from_ca_cert_der(certificate.der(), signing_key).map_err(generation)?;
        let private_key = Arc::new(PrivateKey::from_pem(key_pem.as_bytes())?);
        Ok(Self {
            issuer,
            public_key,
            certificate,
            private_key,
            dh_params,
            ca_path,
        })
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The root private key, also the private key of every synthesized leaf.
    pub fn private_key(&self) -> &Arc<PrivateKey> {
        &self.private_key
    }

    pub fn dh_params(&self) -> &DhParams {
        &self.dh_params
    }

    /// Path of the combined certificate and key file, when persisted.
    pub fn ca_path(&self) -> Option<&Path> {
        self.ca_path.as_deref()
    }

    pub(crate) fn issuer(&self) -> &Issuer<'static, KeyPair> {
        &self.issuer
    }

    pub(crate) fn public_key(&self) -> &KeyPair {
        &self.public_key
    }
}

impl fmt::Debug for TrustRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustRoot")
            .field("certificate", &self.certificate)
            .field("ca_path", &self.ca_path)
            .field("dh_prime_bits", &self.dh_params.prime_bits())
            .finish_non_exhaustive()
    }
}

fn load_material(path: &Path) -> Result<(Certificate, String), CertgenError> {
    let raw = fs::read(path).map_err(|e| CertgenError::storage(path, e))?;
    let certificate = Certificate::from_pem(&raw)?;
    let key = PrivateKey::from_pem(&raw)?;
    let pkey = PKey::private_key_from_der(key.secret_der())?;
    ensure_key_matches(&certificate, &pkey, path)?;
    Ok((certificate, pkcs8_pem(&pkey)?))
}

fn create_store(
    dir: &Path,
    paths: &RootPaths,
    label: &str,
    options: &RootOptions,
) -> Result<(Certificate, String), CertgenError> {
    fs::create_dir_all(dir).map_err(|e| CertgenError::storage(dir, e))?;

    let (certificate, pkey) = generate_root(label, options)?;
    let key_pem = pkcs8_pem(&pkey)?;
    let cert_pem = certificate.to_pem();

    write_private(&paths.ca_pem, format!("{cert_pem}{key_pem}").as_bytes())?;
    write_file(&paths.cert_pem, cert_pem.as_bytes())?;
    write_file(&paths.cert_cer, cert_pem.as_bytes())?;

    let x509 = X509::from_der(certificate.der())?;
    write_file(&paths.cert_p12, &pkcs12_der(label, &x509, None)?)?;
    write_private(&paths.ca_p12, &pkcs12_der(label, &x509, Some(&pkey))?)?;
    write_file(&paths.dhparam, DEFAULT_DHPARAM)?;

    Ok((certificate, key_pem))
}

fn generate_root(
    label: &str,
    options: &RootOptions,
) -> Result<(Certificate, PKey<Private>), CertgenError> {
    let pkey = PKey::from_rsa(Rsa::generate(ROOT_KEY_BITS)?)?;
    let key_pair = KeyPair::from_pem(&pkcs8_pem(&pkey)?).map_err(generation)?;

    let cert = root_params(label, options)
        .self_signed(&key_pair)
        .map_err(generation)?;
    let certificate = Certificate::from_der(cert.der().to_vec())?;
    Ok((certificate, pkey))
}

fn root_params(label: &str, options: &RootOptions) -> CertificateParams {
    let mut params = CertificateParams::default();

    let mut dn = DistinguishedName::new();
    dn.push(
        DnType::CommonName,
        options.common_name.as_deref().unwrap_or(label),
    );
    dn.push(
        DnType::OrganizationName,
        options.organization.as_deref().unwrap_or(label),
    );
    params.distinguished_name = dn;

    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ServerAuth,
        ExtendedKeyUsagePurpose::ClientAuth,
        ExtendedKeyUsagePurpose::EmailProtection,
        ExtendedKeyUsagePurpose::TimeStamping,
        ExtendedKeyUsagePurpose::CodeSigning,
        ExtendedKeyUsagePurpose::Other(MS_CODE_IND.to_vec()),
        ExtendedKeyUsagePurpose::Other(MS_CODE_COM.to_vec()),
        ExtendedKeyUsagePurpose::Other(MS_CTL_SIGN.to_vec()),
        ExtendedKeyUsagePurpose::Other(MS_SGC.to_vec()),
        ExtendedKeyUsagePurpose::Other(MS_EFS.to_vec()),
        ExtendedKeyUsagePurpose::Other(NS_SGC.to_vec()),
    ];

    params.custom_extensions = vec![CustomExtension::from_oid_content(
        NS_CERT_TYPE,
        NS_CERT_TYPE_SSL_CA.to_vec(),
    )];

    let now = OffsetDateTime::now_utc();
    params.not_before = now - crate::CLOCK_SKEW;
    params.not_after = now + options.validity;
    params.serial_number = Some(serial::to_serial_number(serial::root_serial()));
    params
}

fn ensure_key_matches(
    certificate: &Certificate,
    pkey: &PKey<Private>,
    path: &Path,
) -> Result<(), CertgenError> {
    let public = X509::from_der(certificate.der())?.public_key()?;
    if public.public_eq(pkey) {
        Ok(())
    } else {
        Err(CertgenError::KeyMismatch(path.to_path_buf()))
    }
}

fn pkcs8_pem(pkey: &PKey<Private>) -> Result<String, CertgenError> {
    String::from_utf8(pkey.private_key_to_pem_pkcs8()?)
        .map_err(|e| CertgenError::Generation(e.to_string()))
}

fn pkcs12_der(
    name: &str,
    cert: &X509,
    key: Option<&PKey<Private>>,
) -> Result<Vec<u8>, CertgenError> {
    let mut builder = Pkcs12::builder();
    builder.name(name).cert(cert);
    if let Some(key) = key {
        builder.pkey(key);
    }
    Ok(builder.build2("")?.to_der()?)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), CertgenError> {
    fs::write(path, contents).map_err(|e| CertgenError::storage(path, e))
}

/// Write a file holding private key material, readable by the owner only.
fn write_private(path: &Path, contents: &[u8]) -> Result<(), CertgenError> {
    write_file(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| CertgenError::storage(path, e))?;
    }
    Ok(())
}

#[allow(clippy::needless_pass_by_value)]
fn generation(error: rcgen::Error) -> CertgenError {
    CertgenError::Generation(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_root_is_a_2048_bit_rsa_ca() {
        let root = TrustRoot::ephemeral("unit", &RootOptions::default()).unwrap();
        let cert = root.certificate();
        assert_eq!(cert.key_info().algorithm, "RSA");
        assert_eq!(cert.key_info().bits, 2048);
        assert_eq!(cert.common_name(), Some(b"unit".as_slice()));
        assert_eq!(cert.subject(), cert.issuer());
        assert!(root.ca_path().is_none());
    }

    /// DER of the nsCertType extension: OID, then the BIT STRING wrapped in an OCTET STRING.
    const NS_CERT_TYPE_EXTENSION: &[u8] = &[
        0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x86, 0xf8, 0x42, 0x01, 0x01, 0x04, 0x04, 0x03, 0x02,
        0x02, 0x04,
    ];

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|window| window == needle)
    }

    #[test]
    fn root_is_marked_as_ssl_ca() {
        let root = TrustRoot::ephemeral("unit", &RootOptions::default()).unwrap();
        assert!(contains(root.certificate().der(), NS_CERT_TYPE_EXTENSION));

        let leaf = crate::synthesize(&root, Some(b"leaf.example"), &[]).unwrap();
        assert!(!contains(leaf.der(), &NS_CERT_TYPE_EXTENSION[..11]));
    }

    #[test]
    fn root_validity_is_backdated_and_configurable() {
        let options = RootOptions {
            validity: time::Duration::days(30),
            ..RootOptions::default()
        };
        let before = OffsetDateTime::now_utc();
        let root = TrustRoot::ephemeral("unit", &options).unwrap();
        let cert = root.certificate();

        let backdate = before - cert.not_before();
        assert!(backdate >= time::Duration::hours(47));
        assert!(backdate <= time::Duration::hours(49));
        let lifetime = cert.not_after() - before;
        assert!(lifetime > time::Duration::days(29));
        assert!(lifetime <= time::Duration::days(30) + time::Duration::minutes(1));
    }

    #[test]
    fn options_override_subject() {
        let options = RootOptions {
            organization: Some("Example Org".to_string()),
            common_name: Some("Example Root".to_string()),
            ..RootOptions::default()
        };
        let root = TrustRoot::ephemeral("unit", &options).unwrap();
        let subject = root.certificate().subject();
        assert!(subject
            .iter()
            .any(|c| c.short_name == "O" && c.value == b"Example Org"));
        assert_eq!(
            root.certificate().common_name(),
            Some(b"Example Root".as_slice())
        );
    }

    #[test]
    fn from_pem_rejects_mismatched_key() {
        let a = TrustRoot::ephemeral("a", &RootOptions::default()).unwrap();
        let b = TrustRoot::ephemeral("b", &RootOptions::default()).unwrap();
        let result = TrustRoot::from_pem(
            a.certificate().to_pem().as_bytes(),
            b.private_key().to_pem().as_bytes(),
        );
        assert!(matches!(result, Err(CertgenError::KeyMismatch(_))));
    }

    #[test]
    fn from_pem_accepts_matching_material() {
        let a = TrustRoot::ephemeral("a", &RootOptions::default()).unwrap();
        let reloaded = TrustRoot::from_pem(
            a.certificate().to_pem().as_bytes(),
            a.private_key().to_pem().as_bytes(),
        )
        .unwrap();
        assert_eq!(reloaded.certificate(), a.certificate());
    }
}
