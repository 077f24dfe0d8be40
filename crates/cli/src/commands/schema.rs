//! Schema status.
//!
//! ```bash
//! washday-cli schema check
//! ```
//!
//! Reports each marketplace relation as present or missing and fails if
//! any is missing.

use washday_server::db::{RelationStatus, relation_status};

use super::{CommandError, database_url};

fn missing(statuses: &[RelationStatus]) -> usize {
    statuses.iter().filter(|status| !status.exists).count()
}

/// Check that every marketplace relation exists.
///
/// # Errors
///
/// Returns [`CommandError::RelationsMissing`] if any relation is absent.
pub async fn check() -> Result<(), CommandError> {
    let pool = washday_server::db::create_pool(&database_url()?).await?;
    let statuses = relation_status(&pool).await?;

    for status in &statuses {
        if status.exists {
            tracing::info!(relation = %status.relation, "present");
        } else {
            tracing::warn!(relation = %status.relation, "missing");
        }
    }

    match missing(&statuses) {
        0 => {
            tracing::info!("All {} relations present", statuses.len());
            Ok(())
        }
        count => Err(CommandError::RelationsMissing(count)),
    }
}
