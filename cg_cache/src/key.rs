//! Deterministic cache keys.

use std::fmt::Write;

use sha2::Digest;
use sha2::Sha256;

/// Build a stable cache key from a namespace and an ordered list of parts
///
/// The namespace and every part are length-prefixed before hashing, so
/// `("a", "bc")` and `("ab", "c")` produce different keys. The result reads
/// `"{namespace}:{sha256 hex}"`.
pub fn generate_key<I, S>(namespace: &str, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = CacheKeyBuilder::new(namespace);
    for part in parts {
        builder = builder.part(part);
    }
    builder.build()
}

/// Incremental form of [`generate_key`]
#[derive(Clone)]
pub struct CacheKeyBuilder {
    namespace: String,
    hasher: Sha256,
}

impl CacheKeyBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let mut hasher = Sha256::new();
        update_prefixed(&mut hasher, namespace.as_bytes());
        Self { namespace, hasher }
    }

    /// Append the next part
    pub fn part(mut self, part: impl AsRef<str>) -> Self {
        update_prefixed(&mut self.hasher, part.as_ref().as_bytes());
        self
    }

    /// Append a part formatted with `Display`, e.g. a seed or a dimension
    pub fn display_part(self, part: impl std::fmt::Display) -> Self {
        self.part(part.to_string())
    }

    pub fn build(self) -> String {
        let digest = self.hasher.finalize();
        let mut key = String::with_capacity(self.namespace.len() + 1 + digest.len() * 2);
        key.push_str(&self.namespace);
        key.push(':');
        for byte in digest.iter() {
            let _ = write!(key, "{byte:02x}");
        }
        key
    }
}

fn update_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
