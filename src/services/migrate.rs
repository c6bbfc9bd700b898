use anyhow::anyhow;
use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies pending migrations over a blocking connection and returns how many ran.
pub fn apply(database_url: &str) -> anyhow::Result<usize> {
    let mut conn = PgConnection::establish(database_url)?;
    // boxed error, no `From` impl into anyhow
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))?;
    Ok(applied.len())
}

pub async fn run(database_url: String) -> anyhow::Result<()> {
    let count = tokio::task::spawn_blocking(move || apply(&database_url)).await??;
    tracing::info!(count, "migrations applied");
    Ok(())
}
