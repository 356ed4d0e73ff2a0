use std::future::Future;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{timeout_at, Instant};

use shared_database::StoreError;

/// Per-request deadline shared by every suspension point of one operation.
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
    deadline: Instant,
}

impl CallContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { deadline: Instant::now() + timeout }
    }

    /// Runs a store call, failing with `StoreError::Timeout` once the deadline passes.
    pub async fn run<F, T>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        timeout_at(self.deadline, call)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    pub async fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> Result<MutexGuard<'a, T>, StoreError> {
        timeout_at(self.deadline, mutex.lock())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}
