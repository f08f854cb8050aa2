//! # Database Migrations
//!
//! Embedded schema migrations, applied automatically on startup.
//!
//! ## How It Works
//! Migration files live in `migrations/sqlite/` at the workspace root and are
//! compiled into the binary by `sqlx::migrate!`. sqlx tracks applied
//! migrations in the `_sqlx_migrations` table, so re-running is a no-op.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

/// Embedded migrations, resolved relative to this crate's manifest.
static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations.
///
/// Idempotent: already-applied migrations are skipped.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!("Checking for pending migrations");
    MIGRATOR.run(pool).await?;
    info!("Database schema is up to date");
    Ok(())
}

/// Returns the list of applied migration versions.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<Vec<i64>> {
    let versions: Vec<i64> =
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations ORDER BY version")
            .fetch_all(pool)
            .await?;
    Ok(versions)
}

// =============================================================================
// Unit Tests
// =============================================================================
