//! Data access gateway.
//!
//! Every orchestrator reaches the store through [`DataGateway`], a thin
//! CRUD surface over the named relations in [`Relation`]. Two
//! implementations exist:
//!
//! - [`postgrest::PostgrestGateway`] - the hosted backend's REST data API
//! - [`memory::MemoryGateway`] - an in-process store for tests and local runs
//!
//! Store failures are classified once, here, into [`GatewayErrorKind`] so
//! callers never inspect message text.

pub mod memory;
pub mod postgrest;
mod typed;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use typed::{from_row, insert_as, select_as, select_one_as, to_row};

/// A record as exchanged with the store: column name to JSON value.
pub type Row = Map<String, Value>;

// =============================================================================
// Relations
// =============================================================================

/// Named relations (tables) in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    Profiles,
    VendorProfiles,
    Vehicles,
    Services,
    VendorServiceAreas,
    Bookings,
    Reviews,
}

impl Relation {
    /// Every relation the application expects to exist.
    pub const ALL: [Self; 7] = [
        Self::Profiles,
        Self::VendorProfiles,
        Self::Vehicles,
        Self::Services,
        Self::VendorServiceAreas,
        Self::Bookings,
        Self::Reviews,
    ];

    /// Table name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::VendorProfiles => "vendor_profiles",
            Self::Vehicles => "vehicles",
            Self::Services => "services",
            Self::VendorServiceAreas => "vendor_service_areas",
            Self::Bookings => "bookings",
            Self::Reviews => "reviews",
        }
    }

    /// Primary key column.
    ///
    /// Profiles and vendor profiles are keyed by the identity id itself,
    /// which is what makes "one profile per identity" a storage guarantee.
    #[must_use]
    pub const fn primary_key(self) -> &'static str {
        "id"
    }

    /// Whether the store generates the primary key on insert.
    #[must_use]
    pub const fn generates_id(self) -> bool {
        !matches!(self, Self::Profiles | Self::VendorProfiles)
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Queries
// =============================================================================

/// A row filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value` (`null` matches missing/null columns).
    Eq(String, Value),
    /// `column IN (values)`.
    In(String, Vec<Value>),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Filters, ordering and limit for a read, update or delete.
///
/// ```
/// use washday_server::gateway::{Direction, Query};
///
/// let query = Query::new()
///     .eq("vendor_id", "6f1c1d2e-8a8b-4c2f-9d1e-2b3c4d5e6f70")
///     .eq("is_active", true)
///     .order_by("price", Direction::Ascending)
///     .limit(10);
/// assert_eq!(query.filters().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    order: Vec<Order>,
    limit: Option<usize>,
}

impl Query {
    /// An unfiltered query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    /// Add a membership filter.
    #[must_use]
    pub fn any_of<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In(
            column.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Append a sort key.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(Order {
            column: column.into(),
            direction,
        });
        self
    }

    /// Cap the number of rows returned.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn ordering(&self) -> &[Order] {
        &self.order
    }

    #[must_use]
    pub const fn row_limit(&self) -> Option<usize> {
        self.limit
    }
}

/// What an upsert does when the conflict key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Overwrite the existing row with the supplied columns.
    MergeDuplicates,
    /// Keep the existing row; the upsert reports no row.
    IgnoreDuplicates,
}

/// Conflict target and resolution for [`DataGateway::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnConflict {
    /// Column, or comma-separated columns of a composite unique key.
    pub key: &'static str,
    pub resolution: ConflictResolution,
}

impl OnConflict {
    #[must_use]
    pub const fn merge(key: &'static str) -> Self {
        Self {
            key,
            resolution: ConflictResolution::MergeDuplicates,
        }
    }

    #[must_use]
    pub const fn ignore(key: &'static str) -> Self {
        Self {
            key,
            resolution: ConflictResolution::IgnoreDuplicates,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// A relation or column the application expects does not exist.
    SchemaMissing,
    /// Uniqueness, foreign-key or check constraint violated.
    Constraint,
    /// A single-row lookup matched nothing.
    NotFound,
    /// The store returned something that does not decode.
    Malformed,
    /// The store could not be reached or failed transiently.
    Unavailable,
    /// Anything else.
    Unknown,
}

/// A classified store failure.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} on {relation}: {message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub relation: Relation,
    pub message: String,
    /// Store-specific code, e.g. `23505` or `PGRST116`.
    pub code: Option<String>,
}

impl GatewayError {
    #[must_use]
    pub fn new(kind: GatewayErrorKind, relation: Relation, message: impl Into<String>) -> Self {
        Self {
            kind,
            relation,
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn not_found(relation: Relation) -> Self {
        Self::new(GatewayErrorKind::NotFound, relation, "no matching row")
    }

    /// Classify a Postgres SQLSTATE or `PostgREST` error code.
    #[must_use]
    pub fn classify(code: &str) -> GatewayErrorKind {
        match code {
            // undefined_table, undefined_column, schema cache miss
            "42P01" | "42703" | "3F000" | "PGRST204" | "PGRST205" => {
                GatewayErrorKind::SchemaMissing
            }
            "PGRST116" => GatewayErrorKind::NotFound,
            c if c.starts_with("23") => GatewayErrorKind::Constraint,
            // invalid_text_representation and friends: bad input to a typed column
            c if c.starts_with("22") => GatewayErrorKind::Malformed,
            c if c.starts_with("08") || c.starts_with("53") || c.starts_with("57") => {
                GatewayErrorKind::Unavailable
            }
            _ => GatewayErrorKind::Unknown,
        }
    }

    #[must_use]
    pub const fn is_schema_missing(&self) -> bool {
        matches!(self.kind, GatewayErrorKind::SchemaMissing)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind, GatewayErrorKind::NotFound)
    }
}

// =============================================================================
// Gateway trait
// =============================================================================

/// CRUD access to the store.
///
/// Ownership is never implied: callers scope every identity-owned read and
/// write with an explicit owner filter.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Rows matching `query`.
    async fn select(&self, relation: Relation, query: &Query) -> Result<Vec<Row>, GatewayError>;

    /// The first row matching `query`, or a `NotFound` error.
    async fn select_one(&self, relation: Relation, query: &Query) -> Result<Row, GatewayError> {
        let query = query.clone().limit(1);
        self.select(relation, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::not_found(relation))
    }

    /// Insert one record and return it as stored (with generated columns).
    async fn insert(&self, relation: Relation, record: Row) -> Result<Row, GatewayError>;

    /// Insert or resolve a conflict on `on_conflict.key`.
    ///
    /// Returns `None` when the row already existed and the resolution is
    /// [`ConflictResolution::IgnoreDuplicates`].
    async fn upsert(
        &self,
        relation: Relation,
        record: Row,
        on_conflict: OnConflict,
    ) -> Result<Option<Row>, GatewayError>;

    /// Apply `patch` to matching rows; returns rows affected.
    async fn update(
        &self,
        relation: Relation,
        patch: Row,
        query: &Query,
    ) -> Result<u64, GatewayError>;

    /// Delete matching rows; returns rows affected.
    async fn delete(&self, relation: Relation, query: &Query) -> Result<u64, GatewayError>;
}
