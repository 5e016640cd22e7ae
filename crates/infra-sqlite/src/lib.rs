// GDK Bridge Infrastructure - SQLite Adapter
// Implements: SaveStore (per-user save containers)

mod connection;
mod migration;
mod save_store;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use save_store::{validate_container_name, SaveQuota, SqliteSaveStore};

use gdkbridge_core::error::AppError;

// Orphan rules rule out `From<sqlx::Error> for AppError`, so conversions go through here
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "2067" | "1555" => AppError::Conflict(format!(
                    "Unique constraint violation: {} ({})",
                    db_err.message(),
                    code
                )),
                "5" => AppError::Storage(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                "13" => AppError::Storage(format!("Database full: {}", db_err.message())),
                other => AppError::Storage(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            },
            None => AppError::Storage(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
        _ => AppError::Storage(err.to_string()),
    }
}
