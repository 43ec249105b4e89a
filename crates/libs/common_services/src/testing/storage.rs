use crate::storage::{MediaStore, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory object store keyed by storage location, with optional
/// injected transient failures for retry tests.
#[derive(Default)]
pub struct MemoryMediaStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failures_left: AtomicUsize,
}

impl MemoryMediaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_object(self, location: &str, bytes: &[u8]) -> Self {
        self.objects
            .lock()
            .expect("object map poisoned")
            .insert(location.to_owned(), bytes.to_vec());
        self
    }

    /// Make the next `n` fetches fail with a transient upstream error.
    pub fn fail_next_fetches(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StorageError::Upstream("injected failure".to_owned()));
        }

        self.objects
            .lock()
            .expect("object map poisoned")
            .get(location)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(location.to_owned()))
    }
}
