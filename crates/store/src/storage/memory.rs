use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{parent_dir, ByteStore, Presence, StorageError};

/// Map-backed byte store with read accounting and fault injection.
#[derive(Default)]
pub struct InMemoryByteStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
    dirs: RwLock<HashSet<String>>,
    faults: RwLock<Faults>,
    reads: AtomicUsize,
}

#[derive(Default)]
struct Faults {
    read: HashSet<String>,
    write: HashSet<String>,
    delete: HashSet<String>,
    read_delay: Option<Duration>,
}

impl InMemoryByteStore {
    pub async fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        if let Some(dir) = parent_dir(path) {
            self.add_dir_chain(dir).await;
        }
        self.files.write().await.insert(path.to_string(), bytes.into());
    }

    pub async fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(path).cloned()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.files.read().await.contains_key(path)
    }

    pub async fn has_dir(&self, path: &str) -> bool {
        self.dirs.read().await.contains(path)
    }

    /// Number of `read` calls served so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub async fn fail_reads_on(&self, path: &str) {
        self.faults.write().await.read.insert(path.to_string());
    }

    pub async fn fail_writes_on(&self, path: &str) {
        self.faults.write().await.write.insert(path.to_string());
    }

    pub async fn fail_deletes_on(&self, path: &str) {
        self.faults.write().await.delete.insert(path.to_string());
    }

    pub async fn clear_faults(&self) {
        *self.faults.write().await = Faults::default();
    }

    /// Every subsequent read sleeps for `delay` before touching the map.
    pub async fn set_read_delay(&self, delay: Duration) {
        self.faults.write().await.read_delay = Some(delay);
    }

    async fn add_dir_chain(&self, dir: &str) {
        let mut dirs = self.dirs.write().await;
        let mut prefix = String::new();
        for segment in dir.split('/').filter(|segment| !segment.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            dirs.insert(prefix.clone());
        }
    }

    async fn injected(&self, path: &str, operation: Operation) -> bool {
        let faults = self.faults.read().await;
        let paths = match operation {
            Operation::Read => &faults.read,
            Operation::Write => &faults.write,
            Operation::Delete => &faults.delete,
        };
        paths.contains(path)
    }
}

#[derive(Clone, Copy, Debug)]
enum Operation {
    Read,
    Write,
    Delete,
}

fn injected_failure(path: &str, operation: &str) -> StorageError {
    StorageError::Io {
        path: path.to_string(),
        source: io::Error::new(io::ErrorKind::Other, format!("injected {operation} failure")),
    }
}

#[async_trait]
impl ByteStore for InMemoryByteStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let delay = self.faults.read().await.read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.injected(path, Operation::Read).await {
            return Err(injected_failure(path, "read"));
        }
        self.files
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.injected(path, Operation::Write).await {
            return Err(injected_failure(path, "write"));
        }
        if let Some(dir) = parent_dir(path) {
            if !self.has_dir(dir).await {
                return Err(StorageError::NotFound(dir.to_string()));
            }
        }
        self.files.write().await.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<Presence, StorageError> {
        if self.contains(path).await || self.has_dir(path).await {
            Ok(Presence::Exists)
        } else {
            Ok(Presence::NotFound)
        }
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), StorageError> {
        if !recursive {
            if let Some(parent) = parent_dir(path) {
                if !self.has_dir(parent).await {
                    return Err(StorageError::NotFound(parent.to_string()));
                }
            }
        }
        self.add_dir_chain(path).await;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        if self.injected(path, Operation::Delete).await {
            return Err(injected_failure(path, "delete"));
        }
        match self.files.write().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(path.to_string())),
        }
    }

    fn locator(&self, path: &str) -> String {
        format!("memory:///{path}")
    }
}
