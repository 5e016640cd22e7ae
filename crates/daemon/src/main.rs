//! GDK Bridge daemon
//!
//! Wires the local platform adapters and the SQLite save store into one
//! runtime and serves it over JSON-RPC until Ctrl+C.

mod pump;
mod settings;
mod telemetry;

use anyhow::{Context, Result};
use gdkbridge_api_rpc::handler::RateLimitConfig;
use gdkbridge_api_rpc::{RpcServer, RpcServerConfig};
use gdkbridge_core::application::{shutdown_channel, Runtime, RuntimeDeps, StatsFlushScheduler};
use gdkbridge_core::port::{SequentialIdProvider, SystemTimeProvider};
use gdkbridge_infra_local::{LocalPlatform, PlatformFixture};
use gdkbridge_infra_sqlite::{create_pool, run_migrations, SqliteSaveStore};
use settings::DaemonConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing()?;
    info!("GDK Bridge v{} starting...", VERSION);

    let config = DaemonConfig::load()?;

    // Save store
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    info!(db_path = %db_path.display(), "Opening save store...");
    let pool = create_pool(&db_path.to_string_lossy())
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;
    let saves = Arc::new(SqliteSaveStore::new(pool, Arc::new(SystemTimeProvider)));

    // Platform
    let fixture = match config.fixture_path() {
        Some(path) => PlatformFixture::load(&path)
            .with_context(|| format!("failed to load fixture {}", path.display()))?,
        None => {
            info!("No fixture configured, using the built-in demo platform");
            PlatformFixture::builtin()
        }
    };
    let platform = LocalPlatform::new(fixture);

    let runtime = Arc::new(Runtime::init(
        RuntimeDeps {
            directory: platform.users,
            store: platform.store,
            live: platform.live,
            saves,
            ids: Arc::new(SequentialIdProvider::new()),
        },
        Handle::current(),
    ));

    // JSON-RPC
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
        rate_limit: RateLimitConfig {
            burst: config.rate_limit_burst,
            rate_per_sec: config.rate_limit_rate,
        },
    };
    let (rpc_handle, addr) = RpcServer::new(rpc_config, Arc::clone(&runtime))
        .start()
        .await
        .context("RPC server start failed")?;

    // Background tasks
    let (shutdown_tx, shutdown_token) = shutdown_channel();
    let flush = StatsFlushScheduler::new(runtime.live(), config.stats_flush_interval());
    let flush_handle = tokio::spawn(flush.run(shutdown_tx.token()));
    let pump_handle = tokio::spawn(pump::run(
        Arc::clone(&runtime),
        config.update_interval(),
        shutdown_token,
    ));

    info!(addr = %addr, "System ready. Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // Stop issuing first so the final stats flush sees no new work
    runtime.quit();
    shutdown_tx.shutdown();
    for (name, handle) in [("stats flush", flush_handle), ("update pump", pump_handle)] {
        if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
            warn!(task = name, "Background task did not stop in time");
        }
    }
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    rpc_handle.stopped().await;

    info!("Shutdown complete.");
    Ok(())
}
