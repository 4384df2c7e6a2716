//! PEM-encoded private keys.

use std::fmt;

use rustls::pki_types::PrivateKeyDer;

use crate::error::DecodeError;

/// A private key in one of the DER encodings rustls understands.
pub struct PrivateKey {
    der: PrivateKeyDer<'static>,
}

impl PrivateKey {
    /// Parse the first private key found in PEM input.
    ///
    /// PKCS#8, PKCS#1 (`RSA PRIVATE KEY`) and SEC1 (`EC PRIVATE KEY`) blocks
    /// are accepted; certificate blocks in the same input are skipped.
    pub fn from_pem(pem: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = std::io::BufReader::new(pem);
        let der = rustls_pemfile::private_key(&mut reader)
            .map_err(|e| DecodeError::Pem(e.to_string()))?
            .ok_or(DecodeError::NoPrivateKey)?;
        Ok(Self { der })
    }

    pub fn der(&self) -> &PrivateKeyDer<'static> {
        &self.der
    }

    pub fn secret_der(&self) -> &[u8] {
        self.der.secret_der()
    }

    pub fn to_pem(&self) -> String {
        let tag = match &self.der {
            PrivateKeyDer::Pkcs1(_) => "RSA PRIVATE KEY",
            PrivateKeyDer::Sec1(_) => "EC PRIVATE KEY",
            _ => "PRIVATE KEY",
        };
        let block = pem::Pem::new(tag, self.secret_der().to_vec());
        pem::encode_config(
            &block,
            pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
        )
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self {
            der: self.der.clone_key(),
        }
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.secret_der() == other.secret_der()
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}
