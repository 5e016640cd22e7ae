//! Shared setup: a runtime over an in-memory SQLite save store and the
//! built-in local platform.

#![allow(dead_code)]

use gdkbridge_core::application::{Runtime, RuntimeDeps};
use gdkbridge_core::domain::Envelope;
use gdkbridge_core::port::{SequentialIdProvider, SystemTimeProvider};
use gdkbridge_infra_local::{LocalPlatform, PlatformFixture};
use gdkbridge_infra_sqlite::{create_pool, run_migrations, SqliteSaveStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub const PLAYER: u64 = 0x0009_0000_0000_0001;
pub const GUEST: u64 = 0x0009_0000_0000_0002;

pub async fn runtime() -> Arc<Runtime> {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    let platform = LocalPlatform::new(PlatformFixture::builtin());

    Arc::new(Runtime::init(
        RuntimeDeps {
            directory: platform.users,
            store: platform.store,
            live: platform.live,
            saves: Arc::new(SqliteSaveStore::new(pool, Arc::new(SystemTimeProvider))),
            ids: Arc::new(SequentialIdProvider::new()),
        },
        Handle::current(),
    ))
}

/// Run update steps until `count` envelopes arrived (or give up after ~2s)
pub async fn collect(runtime: &Runtime, count: usize) -> Vec<Envelope> {
    let mut seen = Vec::new();
    for _ in 0..400 {
        seen.extend(runtime.update().unwrap());
        if seen.len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    seen
}
