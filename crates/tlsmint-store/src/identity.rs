//! Requested identities and the keys they are cached under.

/// A key in the certificate cache.
///
/// One cached entry may be reachable through several keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    /// A single host name or asterisk form, or the catch-all `*`.
    Name(Vec<u8>),
    /// The exact common name and SAN list a leaf was synthesized for.
    Exact {
        common_name: Option<Vec<u8>>,
        sans: Vec<Vec<u8>>,
    },
}

impl IdentityKey {
    pub fn name(name: impl Into<Vec<u8>>) -> Self {
        Self::Name(name.into())
    }

    /// The catch-all key consulted after every name-based key.
    pub fn wildcard() -> Self {
        Self::Name(b"*".to_vec())
    }
}

/// The identity a handshake asks a certificate for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identity {
    common_name: Option<Vec<u8>>,
    sans: Vec<Vec<u8>>,
}

impl Identity {
    pub fn new(common_name: Option<Vec<u8>>, sans: Vec<Vec<u8>>) -> Self {
        Self { common_name, sans }
    }

    pub fn named(common_name: impl Into<Vec<u8>>) -> Self {
        Self {
            common_name: Some(common_name.into()),
            sans: Vec::new(),
        }
    }

    /// No common name and no SANs.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The identity a TLS client asks for by SNI: `host` as both common name
    /// and sole SAN.
    pub fn for_host(host: &str) -> Self {
        Self::named(host).san(host)
    }

    #[must_use]
    pub fn san(mut self, name: impl Into<Vec<u8>>) -> Self {
        self.sans.push(name.into());
        self
    }

    pub fn common_name(&self) -> Option<&[u8]> {
        self.common_name.as_deref()
    }

    pub fn sans(&self) -> &[Vec<u8>] {
        &self.sans
    }

    /// The key a leaf synthesized for this identity is stored under.
    pub fn exact_key(&self) -> IdentityKey {
        IdentityKey::Exact {
            common_name: self.common_name.clone(),
            sans: self.sans.clone(),
        }
    }

    /// Keys to try, highest priority first.
    ///
    /// The asterisk forms of the common name come first, then those of each
    /// SAN in order, then `*`, and finally the exact key.
    pub fn candidate_keys(&self) -> Vec<IdentityKey> {
        let mut keys = Vec::new();
        if let Some(common_name) = self.common_name.as_deref().filter(|cn| !cn.is_empty()) {
            keys.extend(asterisk_forms(common_name).into_iter().map(IdentityKey::Name));
        }
        for san in &self.sans {
            keys.extend(asterisk_forms(san).into_iter().map(IdentityKey::Name));
        }
        keys.push(IdentityKey::wildcard());
        keys.push(self.exact_key());
        keys
    }
}

/// `name` itself followed by its asterisk forms, most specific first.
///
/// `a.b.c` yields `a.b.c`, `*.b.c`, `*.c`. A name without dots yields only
/// itself.
pub fn asterisk_forms(name: &[u8]) -> Vec<Vec<u8>> {
    let mut forms = vec![name.to_vec()];
    let labels: Vec<&[u8]> = name.split(|&b| b == b'.').collect();
    for start in 1..labels.len() {
        let mut form = b"*".to_vec();
        for label in &labels[start..] {
            form.push(b'.');
            form.extend_from_slice(label);
        }
        forms.push(form);
    }
    forms
}
