//! Byte-fetching abstraction for sample assets.
//!
//! The engine addresses samples by URL; where the bytes actually come
//! from (an HTTP asset server in the full application, a local
//! directory for the CLI, an in-memory map in tests) is behind
//! [`SampleSource`].

use std::collections::HashMap;
use std::path::PathBuf;

use crate::AssetError;

/// Fetches raw (undecoded) asset bytes by URL.
pub trait SampleSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError>;
}

/// Resolves sample URLs against a local directory.
///
/// `http://host/kits/kick.wav` and `kits/kick.wav` both map to
/// `<root>/kits/kick.wav`.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, AssetError> {
        // Strip scheme and host if present, keep the path
        let path = match url.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
            None => url,
        };
        let path = path.trim_start_matches('/');
        if path.is_empty() || path.split('/').any(|seg| seg == "..") {
            return Err(AssetError::NotFound(url.to_string()));
        }
        Ok(self.root.join(path))
    }
}

impl SampleSource for DirSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(url)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(url.to_string()),
            _ => AssetError::Io(e),
        })
    }
}

/// In-memory source for tests and bundled demo assets.
#[derive(Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, bytes: Vec<u8>) {
        self.assets.insert(url.to_string(), bytes);
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }
}

impl SampleSource for MemorySource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        self.assets
            .get(url)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(url.to_string()))
    }
}
