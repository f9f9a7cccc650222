use std::sync::Arc;

use budgetbook_core::domain::budget::BudgetNumber;
use budgetbook_core::errors::ApplicationError;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::storage::{parent_dir, ByteStore, StorageError};

#[derive(Debug, Serialize, Deserialize)]
struct SequenceFile {
    next: u32,
}

/// Persistent counter handing out budget numbers, starting at 1.
pub struct BudgetSequence<S> {
    storage: Arc<S>,
    path: String,
    guard: Mutex<()>,
}

impl<S: ByteStore> BudgetSequence<S> {
    pub fn new(storage: Arc<S>, path: impl Into<String>) -> Self {
        Self { storage, path: path.into(), guard: Mutex::new(()) }
    }

    /// The number the next [`allocate`](Self::allocate) call will return.
    pub async fn peek(&self) -> Result<BudgetNumber, ApplicationError> {
        self.read_next().await.map(BudgetNumber)
    }

    /// Returns the current number and persists its successor.
    pub async fn allocate(&self) -> Result<BudgetNumber, ApplicationError> {
        let _guard = self.guard.lock().await;
        let current = self.read_next().await?;

        let bytes = serde_json::to_vec_pretty(&SequenceFile { next: current.saturating_add(1) })
            .map_err(|error| ApplicationError::StorageWrite(error.to_string()))?;
        if let Some(dir) = parent_dir(&self.path) {
            self.storage
                .mkdir(dir, true)
                .await
                .map_err(|error| ApplicationError::StorageWrite(error.to_string()))?;
        }
        self.storage
            .write(&self.path, &bytes)
            .await
            .map_err(|error| ApplicationError::StorageWrite(error.to_string()))?;

        info!(event_name = "sequence.allocated", number = current, "budget number allocated");
        Ok(BudgetNumber(current))
    }

    /// A missing or corrupt file restarts at 1. Any other read fault is an
    /// error so a transient failure never hands out a number twice.
    async fn read_next(&self) -> Result<u32, ApplicationError> {
        let bytes = match self.storage.read(&self.path).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => return Ok(1),
            Err(error) => {
                warn!(
                    event_name = "sequence.read_failed",
                    path = %self.path,
                    error = %error,
                    "budget sequence unreadable"
                );
                return Err(ApplicationError::StorageRead(error.to_string()));
            }
        };
        match serde_json::from_slice::<SequenceFile>(&bytes) {
            Ok(file) => Ok(file.next.max(1)),
            Err(error) => {
                warn!(
                    event_name = "sequence.corrupt",
                    path = %self.path,
                    error = %error,
                    "budget sequence corrupt; restarting at 1"
                );
                Ok(1)
            }
        }
    }
}
