// Save Store Port (per-user containers of named blobs)

use crate::domain::{FileError, UserId};
use async_trait::async_trait;

/// Blob name and contents written as part of one container update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobWrite {
    pub name: String,
    pub data: Vec<u8>,
}

impl BlobWrite {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Persistent save-game storage.
///
/// Errors are the platform save/load codes that end up in the `error` field
/// of the `save_load` envelope.
#[async_trait]
pub trait SaveStore: Send + Sync {
    /// Write every blob into `container` for `user`; nothing is written if any blob fails
    async fn write_blobs(
        &self,
        user: UserId,
        container: &str,
        blobs: Vec<BlobWrite>,
    ) -> std::result::Result<(), FileError>;

    /// Read a single blob
    async fn read_blob(
        &self,
        user: UserId,
        container: &str,
        blob: &str,
    ) -> std::result::Result<Vec<u8>, FileError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    type Key = (UserId, String, String);

    /// In-memory SaveStore with an optional forced failure
    #[derive(Default)]
    pub struct MemorySaveStore {
        blobs: Mutex<HashMap<Key, Vec<u8>>>,
        fail_with: Mutex<Option<FileError>>,
    }

    impl MemorySaveStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every following call fail with `error`
        pub fn fail_with(&self, error: Option<FileError>) {
            *self.fail_with.lock().unwrap() = error;
        }

        pub fn get(&self, user: UserId, container: &str, blob: &str) -> Option<Vec<u8>> {
            self.blobs
                .lock()
                .unwrap()
                .get(&(user, container.to_string(), blob.to_string()))
                .cloned()
        }

        pub fn len(&self) -> usize {
            self.blobs.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl SaveStore for MemorySaveStore {
        async fn write_blobs(
            &self,
            user: UserId,
            container: &str,
            blobs: Vec<BlobWrite>,
        ) -> std::result::Result<(), FileError> {
            if let Some(error) = *self.fail_with.lock().unwrap() {
                return Err(error);
            }
            let mut stored = self.blobs.lock().unwrap();
            for blob in blobs {
                stored.insert((user, container.to_string(), blob.name), blob.data);
            }
            Ok(())
        }

        async fn read_blob(
            &self,
            user: UserId,
            container: &str,
            blob: &str,
        ) -> std::result::Result<Vec<u8>, FileError> {
            if let Some(error) = *self.fail_with.lock().unwrap() {
                return Err(error);
            }
            self.get(user, container, blob)
                .ok_or(FileError::BlobNotFound)
        }
    }
}
