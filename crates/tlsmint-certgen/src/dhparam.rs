//! Diffie-Hellman parameters.

use std::fs;
use std::path::Path;

use openssl::dh::Dh;
use tracing::info;

use crate::error::CertgenError;

/// Pre-generated parameters written out when none exist, so the first start
/// does not pay for parameter generation.
pub const DEFAULT_DHPARAM: &[u8] = b"-----BEGIN DH PARAMETERS-----
MIICCAKCAgEAyT6LzpwVFS3gryIo29J5icvgxCnCebcdSe/NHMkD8dKJf8suFCg3
O2+dguLakSVif/t6dhImxInJk230HmfC8q93hdcg/j8rLGJYDKu3ik6H//BAHKIv
j5O9yjU3rXCfmVJQic2Nne39sg3CreAepEts2TvYHhVv3TEAzEqCtOuTjgDv0ntJ
Gwpj+BJBRQGG9NvprX1YGJ7WOFBP/hWU7d6tgvE6Xa7T/u9QIKpYHMIkcN/l3ZFB
chZEqVlyrcngtSXCROTPcDOQ6Q8QzhaBJS+Z6rcsd7X+haiQqvoFcmaJ08Ks6LQC
ZIL2EtYJw8V8z7C0igVEBIADZBI6OTbuuhDwRw//zU1uq52Oc48CIZlGxTYG/Evq
o9EWAXUYVzWkDSTeBH1r4z/qLPE2cnhtMxbFxuvK53jGB0emy2y1Ei6IhKshJ5qX
IB/aE7SSHyQ3MDHHkCmQJCsOd4Mo26YX61NZ+n501XjqpCBQ2+DfZCBh8Va2wDyv
A2Ryg9SUz8j0AXViRNMJgJrr446yro/FuJZwnQcO3WQnXeqSBnURqKjmqkeFP+d8
6mk2tqJaY507lRNqtGlLnj7f5RNoBFJDCLBNurVgfvq9TCVWKDIFD4vZRjCrnl6I
rD693XKIHUCWOjMh1if6omGXKHH40QuME2gNa50+YPn1iYDl88uDbbMCAQI=
-----END DH PARAMETERS-----
";

/// Validated DH parameters in PEM form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhParams {
    pem: Vec<u8>,
    prime_bits: u32,
}

impl DhParams {
    /// Parse and validate PEM-encoded `DH PARAMETERS`.
    pub fn from_pem(pem: impl Into<Vec<u8>>) -> Result<Self, CertgenError> {
        let pem = pem.into();
        let dh = Dh::params_from_pem(&pem)?;
        let prime_bits = u32::try_from(dh.prime_p().num_bits()).unwrap_or(0);
        Ok(Self { pem, prime_bits })
    }

    /// The built-in parameter set.
    pub fn builtin() -> Result<Self, CertgenError> {
        Self::from_pem(DEFAULT_DHPARAM)
    }

    /// Load parameters from `path`, writing the built-in set there first if
    /// the file does not exist.
    pub fn load_or_write(path: &Path) -> Result<Self, CertgenError> {
        if !path.exists() {
            fs::write(path, DEFAULT_DHPARAM).map_err(|e| CertgenError::storage(path, e))?;
            info!(path = %path.display(), "wrote default DH parameters");
        }
        let pem = fs::read(path).map_err(|e| CertgenError::storage(path, e))?;
        Self::from_pem(pem)
    }

    pub fn pem(&self) -> &[u8] {
        &self.pem
    }

    /// Size of the prime modulus in bits.
    pub fn prime_bits(&self) -> u32 {
        self.prime_bits
    }
}
