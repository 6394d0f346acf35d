//! Version-keyed bundle cache consulted by [`CachedBundle`](crate::request::CachedBundle).
//!
//! The cache decides hit vs. miss on its own and always answers with a single
//! [`Operation`] whose surface matches a plain fetch, so the request only
//! relays progress and dispatches the outcome.

mod disk;

use sha2::{Digest, Sha256};

use crate::operation::Operation;

pub use disk::DiskBundleCache;

/// Looks up bundles by (url, version), downloading on a miss.
pub trait BundleCache: Send + Sync {
    fn load_or_download(&self, url: &str, version: u32) -> Operation<Bundle>;
}

/// A decoded bundle: the cached bytes for one (url, version) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    url: String,
    version: u32,
    data: Vec<u8>,
    digest: String,
}

impl Bundle {
    /// Decode raw bytes into a bundle, computing its SHA-256 digest.
    pub fn decode(url: impl Into<String>, version: u32, data: Vec<u8>) -> Self {
        let digest = hex::encode(Sha256::digest(&data));
        Self {
            url: url.into(),
            version,
            data,
            digest,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Lowercase hex SHA-256 of the bundle bytes.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Stable cache key for a URL: lowercase hex SHA-256 of its bytes.
pub fn url_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}
