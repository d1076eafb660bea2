use std::fmt;

/// Used when neither a compiled-in nor an environment secret is available
pub const FALLBACK_SECRET: &str = "Commotio-Cerebri";

/// Length of an AES-256 key in bytes
pub const KEY_LEN: usize = 32;

/// Where the encryption secret was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Compiled,
    Environment,
    Fallback,
}

/// The secret used to encrypt account keys
#[derive(Clone)]
pub struct SecretKey {
    value: String,
    source: SecretSource,
}

impl SecretKey {
    /// Pick the first non-empty secret: compiled-in, then environment,
    /// then [`FALLBACK_SECRET`]
    pub fn resolve(compiled: Option<&str>, environment: Option<&str>) -> Self {
        if let Some(value) = compiled.filter(|v| !v.is_empty()) {
            return Self::new(value, SecretSource::Compiled);
        }
        if let Some(value) = environment.filter(|v| !v.is_empty()) {
            return Self::new(value, SecretSource::Environment);
        }
        Self::new(FALLBACK_SECRET, SecretSource::Fallback)
    }

    pub fn new(value: &str, source: SecretSource) -> Self {
        Self {
            value: value.to_string(),
            source,
        }
    }

    pub fn source(&self) -> SecretSource {
        self.source
    }

    /// The secret as cipher key material: zero-padded or truncated to 32 bytes
    pub fn key_bytes(&self) -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        let bytes = self.value.as_bytes();
        let len = bytes.len().min(KEY_LEN);
        key[..len].copy_from_slice(&bytes[..len]);
        key
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}
