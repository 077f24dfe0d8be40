//! Direct `PostgreSQL` access.
//!
//! Marketplace data goes through the [`DataGateway`](crate::gateway::DataGateway);
//! this pool serves the session store, readiness checks and schema
//! inspection.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p washday-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::gateway::Relation;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Whether one marketplace relation exists in the `public` schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationStatus {
    pub relation: Relation,
    pub exists: bool,
}

/// Check every marketplace relation.
///
/// # Errors
///
/// Returns `sqlx::Error` if the catalog query fails.
pub async fn relation_status(pool: &PgPool) -> Result<Vec<RelationStatus>, sqlx::Error> {
    let mut statuses = Vec::with_capacity(Relation::ALL.len());
    for relation in Relation::ALL {
        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(format!("public.{}", relation.as_str()))
            .fetch_one(pool)
            .await?;
        statuses.push(RelationStatus { relation, exists });
    }
    Ok(statuses)
}
