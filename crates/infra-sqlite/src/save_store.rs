// SQLite SaveStore Implementation

use crate::map_sqlx_error;
use async_trait::async_trait;
use gdkbridge_core::domain::{FileError, UserId};
use gdkbridge_core::port::{BlobWrite, SaveStore, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

const MIB: u64 = 1024 * 1024;
const MAX_NAME_LEN: usize = 256;

/// Storage limits enforced on every write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveQuota {
    /// Largest single blob (`UpdateTooBig` above)
    pub max_blob_bytes: u64,
    /// Total bytes across all of a user's containers (`QuotaExceeded` above)
    pub max_user_bytes: u64,
}

impl Default for SaveQuota {
    fn default() -> Self {
        Self {
            max_blob_bytes: 16 * MIB,
            max_user_bytes: 256 * MIB,
        }
    }
}

/// Container names: 1..=256 chars of `[A-Za-z0-9_.-/]`, no leading or trailing `/`
pub fn validate_container_name(name: &str) -> Result<(), FileError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('/')
        && !name.ends_with('/')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/'));
    if valid {
        Ok(())
    } else {
        Err(FileError::InvalidContainerName)
    }
}

fn validate_blob_name(name: &str) -> Result<(), FileError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.chars().any(char::is_control) {
        Err(FileError::InvalidContainerName)
    } else {
        Ok(())
    }
}

/// SQLite failures surface to the game as platform save codes
fn storage_failure(err: sqlx::Error) -> FileError {
    let full = matches!(
        &err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("13")
    );
    warn!(error = %map_sqlx_error(err), "Save store operation failed");
    if full {
        FileError::OutOfLocalStorage
    } else {
        FileError::UnknownError
    }
}

/// User ids are stored bit-for-bit in SQLite's signed integer column
fn user_key(user: UserId) -> i64 {
    user.value() as i64
}

pub struct SqliteSaveStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    quota: SaveQuota,
}

impl SqliteSaveStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self::with_quota(pool, time_provider, SaveQuota::default())
    }

    pub fn with_quota(
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        quota: SaveQuota,
    ) -> Self {
        Self {
            pool,
            time_provider,
            quota,
        }
    }

    /// Total bytes stored for `user`
    pub async fn usage(&self, user: UserId) -> Result<u64, FileError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(b.size), 0)
            FROM blobs b JOIN containers c ON b.container_id = c.id
            WHERE c.user_id = ?
            "#,
        )
        .bind(user_key(user))
        .fetch_one(&self.pool)
        .await
        .map_err(storage_failure)?;
        Ok(total.max(0) as u64)
    }

    /// Blob names in a container, sorted
    pub async fn list_blobs(&self, user: UserId, container: &str) -> Result<Vec<String>, FileError> {
        validate_container_name(container)?;
        sqlx::query_scalar(
            r#"
            SELECT b.name
            FROM blobs b JOIN containers c ON b.container_id = c.id
            WHERE c.user_id = ? AND c.name = ?
            ORDER BY b.name
            "#,
        )
        .bind(user_key(user))
        .bind(container)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failure)
    }
}

#[async_trait]
impl SaveStore for SqliteSaveStore {
    async fn write_blobs(
        &self,
        user: UserId,
        container: &str,
        blobs: Vec<BlobWrite>,
    ) -> Result<(), FileError> {
        validate_container_name(container)?;
        for blob in &blobs {
            validate_blob_name(&blob.name)?;
            if blob.data.len() as u64 > self.quota.max_blob_bytes {
                return Err(FileError::UpdateTooBig);
            }
        }

        let now = self.time_provider.now_millis();
        let mut tx = self.pool.begin().await.map_err(storage_failure)?;

        sqlx::query(
            r#"
            INSERT INTO containers (user_id, name, updated_at) VALUES (?, ?, ?)
            ON CONFLICT (user_id, name) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(user_key(user))
        .bind(container)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(storage_failure)?;

        let container_id: i64 =
            sqlx::query_scalar("SELECT id FROM containers WHERE user_id = ? AND name = ?")
                .bind(user_key(user))
                .bind(container)
                .fetch_one(&mut *tx)
                .await
                .map_err(storage_failure)?;

        let used: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(b.size), 0)
            FROM blobs b JOIN containers c ON b.container_id = c.id
            WHERE c.user_id = ?
            "#,
        )
        .bind(user_key(user))
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_failure)?;

        // Later writes of the same name win, as they would applied in order
        let mut projected = used.max(0) as u64;
        let mut replaced = std::collections::HashMap::new();
        for blob in &blobs {
            let previous = match replaced.get(&blob.name) {
                Some(size) => *size,
                None => {
                    let existing: Option<i64> = sqlx::query_scalar(
                        "SELECT size FROM blobs WHERE container_id = ? AND name = ?",
                    )
                    .bind(container_id)
                    .bind(&blob.name)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage_failure)?;
                    existing.unwrap_or(0).max(0) as u64
                }
            };
            projected = projected.saturating_sub(previous) + blob.data.len() as u64;
            replaced.insert(blob.name.clone(), blob.data.len() as u64);
        }
        if projected > self.quota.max_user_bytes {
            debug!(user = %user, projected, "Save rejected by quota");
            return Err(FileError::QuotaExceeded);
        }

        for blob in &blobs {
            sqlx::query(
                r#"
                INSERT INTO blobs (container_id, name, data, size, updated_at) VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (container_id, name) DO UPDATE
                SET data = excluded.data, size = excluded.size, updated_at = excluded.updated_at
                "#,
            )
            .bind(container_id)
            .bind(&blob.name)
            .bind(&blob.data)
            .bind(blob.data.len() as i64)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(storage_failure)?;
        }

        tx.commit().await.map_err(storage_failure)?;
        debug!(user = %user, container, blobs = blobs.len(), "Container updated");
        Ok(())
    }

    async fn read_blob(
        &self,
        user: UserId,
        container: &str,
        blob: &str,
    ) -> Result<Vec<u8>, FileError> {
        validate_container_name(container)?;
        let data: Option<Vec<u8>> = sqlx::query_scalar(
            r#"
            SELECT b.data
            FROM blobs b JOIN containers c ON b.container_id = c.id
            WHERE c.user_id = ? AND c.name = ? AND b.name = ?
            "#,
        )
        .bind(user_key(user))
        .bind(container)
        .bind(blob)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failure)?;

        data.ok_or(FileError::BlobNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use gdkbridge_core::port::time_provider::mocks::FixedClock;

    async fn store(quota: SaveQuota) -> SqliteSaveStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteSaveStore::with_quota(pool, Arc::new(FixedClock::new(1_000)), quota)
    }

    fn user() -> UserId {
        UserId::new(0x0009_0000_0000_0001)
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = store(SaveQuota::default()).await;
        store
            .write_blobs(
                user(),
                "saves/slot1",
                vec![BlobWrite::new("a.sav", vec![1, 2]), BlobWrite::new("b.sav", vec![3])],
            )
            .await
            .unwrap();

        assert_eq!(store.read_blob(user(), "saves/slot1", "a.sav").await.unwrap(), vec![1, 2]);
        assert_eq!(store.list_blobs(user(), "saves/slot1").await.unwrap(), vec!["a.sav", "b.sav"]);
        assert_eq!(store.usage(user()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_data() {
        let store = store(SaveQuota::default()).await;
        store
            .write_blobs(user(), "default", vec![BlobWrite::new("x", vec![0; 8])])
            .await
            .unwrap();
        store
            .write_blobs(user(), "default", vec![BlobWrite::new("x", vec![7; 2])])
            .await
            .unwrap();
        assert_eq!(store.read_blob(user(), "default", "x").await.unwrap(), vec![7, 7]);
        assert_eq!(store.usage(user()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_blob_and_other_users() {
        let store = store(SaveQuota::default()).await;
        store
            .write_blobs(user(), "default", vec![BlobWrite::new("x", vec![1])])
            .await
            .unwrap();
        assert_eq!(
            store.read_blob(UserId::new(2), "default", "x").await,
            Err(FileError::BlobNotFound)
        );
        assert_eq!(
            store.read_blob(user(), "default", "y").await,
            Err(FileError::BlobNotFound)
        );
    }

    #[tokio::test]
    async fn test_container_name_validation() {
        assert!(validate_container_name("saves/slot-1_a.b").is_ok());
        assert!(validate_container_name("").is_err());
        assert!(validate_container_name("/saves").is_err());
        assert!(validate_container_name("saves/").is_err());
        assert!(validate_container_name("bad name").is_err());
        assert!(validate_container_name(&"a".repeat(257)).is_err());

        let store = store(SaveQuota::default()).await;
        assert_eq!(
            store
                .write_blobs(user(), "bad name", vec![BlobWrite::new("x", vec![1])])
                .await,
            Err(FileError::InvalidContainerName)
        );
    }

    #[tokio::test]
    async fn test_quota_limits() {
        let store = store(SaveQuota {
            max_blob_bytes: 4,
            max_user_bytes: 6,
        })
        .await;

        assert_eq!(
            store
                .write_blobs(user(), "default", vec![BlobWrite::new("big", vec![0; 5])])
                .await,
            Err(FileError::UpdateTooBig)
        );

        store
            .write_blobs(user(), "one", vec![BlobWrite::new("a", vec![0; 4])])
            .await
            .unwrap();
        assert_eq!(
            store
                .write_blobs(user(), "two", vec![BlobWrite::new("b", vec![0; 3])])
                .await,
            Err(FileError::QuotaExceeded)
        );
        // Rejected update leaves nothing behind
        assert_eq!(store.usage(user()).await.unwrap(), 4);
        assert!(store.list_blobs(user(), "two").await.unwrap().is_empty());

        // Replacing an existing blob only counts the difference
        store
            .write_blobs(user(), "one", vec![BlobWrite::new("a", vec![0; 2])])
            .await
            .unwrap();
        store
            .write_blobs(user(), "two", vec![BlobWrite::new("b", vec![0; 3])])
            .await
            .unwrap();
        assert_eq!(store.usage(user()).await.unwrap(), 5);
    }
}
