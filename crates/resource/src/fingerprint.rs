//! Collision-resistant fingerprints over provider configuration.

use std::fmt::Display;

use sha2::{Digest, Sha256};

/// Incremental SHA-256 fingerprint over named configuration fields.
///
/// Every field is length-prefixed, so `("ab", "c")` and `("a", "bc")` never
/// produce the same digest.
///
/// ```
/// use relink_resource::Fingerprinter;
///
/// let a = Fingerprinter::new().field("host", "db.local").field("port", 5432).finish();
/// let b = Fingerprinter::new().field("host", "db.local").field("port", 5433).finish();
/// assert_ne!(a, b);
/// ```
#[derive(Clone, Default)]
pub struct Fingerprinter {
    hasher: Sha256,
}

impl std::fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprinter").finish_non_exhaustive()
    }
}

impl Fingerprinter {
    /// Start an empty fingerprint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named field rendered with `Display`.
    #[must_use]
    pub fn field(mut self, name: &str, value: impl Display) -> Self {
        self.write(name.as_bytes());
        self.write(value.to_string().as_bytes());
        self
    }

    /// Add a named optional field; `None` is distinct from every `Some`.
    #[must_use]
    pub fn optional(mut self, name: &str, value: Option<impl Display>) -> Self {
        self.write(name.as_bytes());
        match value {
            Some(v) => {
                self.hasher.update([1u8]);
                self.write(v.to_string().as_bytes());
            }
            None => self.hasher.update([0u8]),
        }
        self
    }

    /// Add key/value pairs in the order given.
    #[must_use]
    pub fn pairs<K, V, I>(mut self, name: &str, pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.write(name.as_bytes());
        for (k, v) in pairs {
            self.write(k.as_ref().as_bytes());
            self.write(v.as_ref().as_bytes());
        }
        self
    }

    /// Hex-encoded digest.
    #[must_use]
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
    }
}
