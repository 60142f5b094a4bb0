//! Schema migrations bundled with the crate

use sqlx::PgPool;

use crate::error::{MetaDataError, MetaDataResult};

/// Apply pending migrations
///
/// Safe to run concurrently with other instances; sqlx serializes on its
/// migration lock.
///
/// # Errors
///
/// Returns `MetaDataError::Database` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> MetaDataResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| MetaDataError::Database(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
