use sqlx::migrate::{MigrateError, Migrator};
use tracing::debug;

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;
    debug!(event_name = "db.migrations.applied", known = MIGRATOR.iter().count(), "schema is up to date");
    Ok(())
}
