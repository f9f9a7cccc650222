use async_trait::async_trait;
use thiserror::Error;

pub mod fs;
pub mod memory;

pub use fs::FsByteStore;
pub use memory::InMemoryByteStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("`{0}` does not exist")]
    NotFound(String),
    #[error("i/o failure on `{path}`: {source}")]
    Io { path: String, source: std::io::Error },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Exists,
    NotFound,
}

/// Path-addressed byte store. Paths are `/`-separated and relative to the store root.
#[async_trait]
pub trait ByteStore: Send + Sync + 'static {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;
    async fn stat(&self, path: &str) -> Result<Presence, StorageError>;
    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), StorageError>;
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Opaque handle for `path` that outer layers can open or share.
    fn locator(&self, path: &str) -> String;
}

/// Directory part of a store path, if it has one.
pub fn parent_dir(path: &str) -> Option<&str> {
    path.rfind('/').map(|index| &path[..index]).filter(|dir| !dir.is_empty())
}

pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
