//! CLI subcommands.

pub mod migrate;
pub mod schema;

use secrecy::SecretString;

/// Errors shared by the database commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Missing environment variable: WASHDAY_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("{0} relation(s) missing; run `washday-cli migrate`")]
    RelationsMissing(usize),
}

/// Database URL from the environment, same lookup as the server.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();
    std::env::var("WASHDAY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingDatabaseUrl)
}
