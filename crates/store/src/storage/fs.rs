use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ByteStore, Presence, StorageError};

/// Byte store rooted at a directory on the local filesystem.
#[derive(Clone, Debug)]
pub struct FsByteStore {
    root: PathBuf,
}

impl FsByteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir().map(|cwd| cwd.join(&root)).unwrap_or(root)
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/').filter(|segment| !segment.is_empty()).fold(self.root.clone(), |acc, segment| {
            acc.join(segment)
        })
    }
}

fn map_io(path: &str, source: std::io::Error) -> StorageError {
    if source.kind() == ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::Io { path: path.to_string(), source }
    }
}

#[async_trait]
impl ByteStore for FsByteStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(self.resolve(path)).await.map_err(|error| map_io(path, error))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        tokio::fs::write(self.resolve(path), bytes).await.map_err(|error| map_io(path, error))
    }

    async fn stat(&self, path: &str) -> Result<Presence, StorageError> {
        match tokio::fs::metadata(self.resolve(path)).await {
            Ok(_) => Ok(Presence::Exists),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Presence::NotFound),
            Err(error) => Err(map_io(path, error)),
        }
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), StorageError> {
        let target = self.resolve(path);
        let result = if recursive {
            tokio::fs::create_dir_all(&target).await
        } else {
            tokio::fs::create_dir(&target).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(error) => Err(map_io(path, error)),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        tokio::fs::remove_file(self.resolve(path)).await.map_err(|error| map_io(path, error))
    }

    fn locator(&self, path: &str) -> String {
        format!("file://{}", self.resolve(path).display())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::storage::{ByteStore, Presence};

    use super::FsByteStore;

    #[tokio::test]
    async fn write_requires_parent_and_mkdir_is_idempotent() {
        let dir = TempDir::new().expect("temp dir");
        let store = FsByteStore::new(dir.path());

        let error = store.write("data/clientes.json", b"[]").await.expect_err("no parent yet");
        assert!(error.is_not_found());

        store.mkdir("data", true).await.expect("mkdir");
        store.mkdir("data", true).await.expect("mkdir again");
        store.write("data/clientes.json", b"[]").await.expect("write");

        assert_eq!(store.read("data/clientes.json").await.expect("read"), b"[]".to_vec());
        assert_eq!(store.stat("data/clientes.json").await.expect("stat"), Presence::Exists);
    }

    #[tokio::test]
    async fn missing_files_surface_as_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let store = FsByteStore::new(dir.path());

        assert!(store.read("nope.json").await.expect_err("missing").is_not_found());
        assert!(store.delete("nope.pdf").await.expect_err("missing").is_not_found());
        assert_eq!(store.stat("nope.json").await.expect("stat"), Presence::NotFound);
    }

    #[tokio::test]
    async fn locator_is_an_absolute_file_uri() {
        let dir = TempDir::new().expect("temp dir");
        let store = FsByteStore::new(dir.path());

        let locator = store.locator("Orcamentos/orcamento_0001.pdf");
        assert!(locator.starts_with("file:///"));
        assert!(locator.ends_with("Orcamentos/orcamento_0001.pdf"));
    }
}
