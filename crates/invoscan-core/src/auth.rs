//! API key lookup for the service boundary.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

/// Answers whether an API key is known.
pub trait ApiKeyStore: Send + Sync {
    fn exists(&self, key: &str) -> bool;
}

/// Keys held in memory, typically loaded from a file with one key per line.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyStore {
    keys: HashSet<String>,
}

impl StaticKeyStore {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .filter(|key: &String| !key.is_empty())
                .collect(),
        }
    }

    /// Load keys from a file. Blank lines and lines starting with `#` are ignored.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let store = Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        );
        debug!("Loaded {} API keys from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl ApiKeyStore for StaticKeyStore {
    fn exists(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}
