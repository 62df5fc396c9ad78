use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::AssetError;

/// Where asset bytes come from. Fetches run on loader threads.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, AssetError>;
}

/// Reads assets from a directory; asset names are paths relative to `root`.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl AssetSource for FileSource {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.root.join(name.trim_start_matches('/'));
        std::fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => AssetError::NotFound(name.to_owned()),
            _ => AssetError::Io { name: name.to_owned(), source },
        })
    }
}

/// In-memory asset store, mostly for tests and embedded resources.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.into(), bytes.into());
        self
    }
}

impl AssetSource for MemorySource {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(name.to_owned()))
    }
}
