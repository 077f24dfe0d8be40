//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! washday-cli migrate
//! ```
//!
//! Applies `crates/server/migrations/` and then creates the session store
//! table used by tower-sessions.
//!
//! # Environment Variables
//!
//! - `WASHDAY_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, database_url};

/// Run all migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = washday_server::db::create_pool(&database_url).await?;

    tracing::info!("Running marketplace migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Creating session store table...");
    PostgresStore::new(pool)
        .migrate()
        .await
        .map_err(|e| CommandError::SessionStore(e.to_string()))?;

    tracing::info!("Migrations complete!");
    Ok(())
}
