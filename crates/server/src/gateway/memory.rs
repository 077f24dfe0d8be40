//! In-process gateway.
//!
//! Mirrors the storage behaviour the application relies on: primary-key
//! uniqueness, generated ids and timestamps, column defaults, restrict-on-
//! delete for booked vehicles and services, and the data API's ordering
//! rules (nulls sort as the greatest value). Relations can be hidden or made
//! to fail writes to exercise error paths.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    ConflictResolution, DataGateway, Direction, Filter, GatewayError, GatewayErrorKind,
    OnConflict, Query, Relation, Row,
};

/// [`DataGateway`] backed by in-memory tables.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Relation, Vec<Row>>,
    missing: HashSet<Relation>,
    failing_writes: HashSet<Relation>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `relation` as never created.
    #[must_use]
    pub fn without_relation(mut self, relation: Relation) -> Self {
        self.state.get_mut().missing.insert(relation);
        self
    }

    /// Make every write to `relation` fail as if the store were down.
    pub async fn fail_writes_to(&self, relation: Relation) {
        self.state.lock().await.failing_writes.insert(relation);
    }

    /// Restore normal writes.
    pub async fn restore_writes(&self) {
        self.state.lock().await.failing_writes.clear();
    }

    /// Snapshot of a table, in insertion order.
    pub async fn rows(&self, relation: Relation) -> Vec<Row> {
        self.state
            .lock()
            .await
            .tables
            .get(&relation)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of rows in a table.
    pub async fn count(&self, relation: Relation) -> usize {
        self.state
            .lock()
            .await
            .tables
            .get(&relation)
            .map_or(0, Vec::len)
    }
}

impl MemoryState {
    fn check_exists(&self, relation: Relation) -> Result<(), GatewayError> {
        if self.missing.contains(&relation) {
            return Err(GatewayError::new(
                GatewayErrorKind::SchemaMissing,
                relation,
                format!("relation \"public.{relation}\" does not exist"),
            )
            .with_code("42P01"));
        }
        Ok(())
    }

    fn check_writable(&self, relation: Relation) -> Result<(), GatewayError> {
        self.check_exists(relation)?;
        if self.failing_writes.contains(&relation) {
            return Err(GatewayError::new(
                GatewayErrorKind::Unavailable,
                relation,
                "connection reset while writing",
            ));
        }
        Ok(())
    }

    /// Strictly increasing so newest-first ordering is deterministic.
    fn next_timestamp(&mut self) -> String {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn table(&mut self, relation: Relation) -> &mut Vec<Row> {
        self.tables.entry(relation).or_default()
    }

    fn insert_row(&mut self, relation: Relation, mut record: Row) -> Result<Row, GatewayError> {
        let key = relation.primary_key();
        if relation.generates_id() && !has_value(&record, key) {
            record.insert(key.to_string(), json!(Uuid::new_v4().to_string()));
        }
        let Some(id) = record.get(key).filter(|v| !v.is_null()).cloned() else {
            return Err(GatewayError::new(
                GatewayErrorKind::Constraint,
                relation,
                format!("null value in column \"{key}\" violates not-null constraint"),
            )
            .with_code("23502"));
        };
        if self
            .table(relation)
            .iter()
            .any(|row| row.get(key).is_some_and(|v| values_equal(v, &id)))
        {
            return Err(GatewayError::new(
                GatewayErrorKind::Constraint,
                relation,
                format!("duplicate key value violates unique constraint \"{relation}_pkey\""),
            )
            .with_code("23505"));
        }

        for (column, value) in column_defaults(relation) {
            if !has_value(&record, column) {
                record.insert(column.to_string(), value);
            }
        }
        let now = self.next_timestamp();
        for column in ["created_at", "updated_at"] {
            if !has_value(&record, column) {
                record.insert(column.to_string(), json!(now));
            }
        }

        self.table(relation).push(record.clone());
        Ok(record)
    }

    /// Bookings reference vehicles and services with `ON DELETE RESTRICT`.
    fn check_not_referenced(&self, relation: Relation, doomed: &[Value]) -> Result<(), GatewayError> {
        let column = match relation {
            Relation::Vehicles => "vehicle_id",
            Relation::Services => "service_id",
            _ => return Ok(()),
        };
        let referenced = self.tables.get(&Relation::Bookings).is_some_and(|bookings| {
            bookings.iter().any(|booking| {
                booking
                    .get(column)
                    .is_some_and(|v| doomed.iter().any(|id| values_equal(v, id)))
            })
        });
        if referenced {
            return Err(GatewayError::new(
                GatewayErrorKind::Constraint,
                relation,
                format!(
                    "update or delete on table \"{relation}\" violates foreign key constraint on table \"bookings\""
                ),
            )
            .with_code("23503"));
        }
        Ok(())
    }
}

#[async_trait]
impl DataGateway for MemoryGateway {
    async fn select(&self, relation: Relation, query: &Query) -> Result<Vec<Row>, GatewayError> {
        let state = self.state.lock().await;
        state.check_exists(relation)?;

        let mut rows: Vec<Row> = state
            .tables
            .get(&relation)
            .map(|rows| rows.iter().filter(|r| matches(r, query)).cloned().collect())
            .unwrap_or_default();

        if !query.ordering().is_empty() {
            rows.sort_by(|a, b| {
                query
                    .ordering()
                    .iter()
                    .map(|order| {
                        let ord = compare_values(a.get(&order.column), b.get(&order.column));
                        match order.direction {
                            Direction::Ascending => ord,
                            Direction::Descending => ord.reverse(),
                        }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        if let Some(limit) = query.row_limit() {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, relation: Relation, record: Row) -> Result<Row, GatewayError> {
        let mut state = self.state.lock().await;
        state.check_writable(relation)?;
        state.insert_row(relation, record)
    }

    async fn upsert(
        &self,
        relation: Relation,
        record: Row,
        on_conflict: OnConflict,
    ) -> Result<Option<Row>, GatewayError> {
        let mut state = self.state.lock().await;
        state.check_writable(relation)?;

        let key: Vec<(&str, Value)> = on_conflict
            .key
            .split(',')
            .map(str::trim)
            .map(|column| (column, record.get(column).cloned().unwrap_or(Value::Null)))
            .collect();
        let position = if key.iter().any(|(_, value)| value.is_null()) {
            None
        } else {
            state.table(relation).iter().position(|row| {
                key.iter().all(|(column, value)| {
                    row.get(*column).is_some_and(|v| values_equal(v, value))
                })
            })
        };

        match (position, on_conflict.resolution) {
            (Some(_), ConflictResolution::IgnoreDuplicates) => Ok(None),
            (Some(index), ConflictResolution::MergeDuplicates) => {
                let row = state
                    .table(relation)
                    .get_mut(index)
                    .ok_or_else(|| GatewayError::not_found(relation))?;
                row.extend(record);
                Ok(Some(row.clone()))
            }
            (None, _) => state.insert_row(relation, record).map(Some),
        }
    }

    async fn update(
        &self,
        relation: Relation,
        patch: Row,
        query: &Query,
    ) -> Result<u64, GatewayError> {
        let mut state = self.state.lock().await;
        state.check_writable(relation)?;

        let mut affected = 0;
        for row in state.table(relation).iter_mut().filter(|r| matches(r, query)) {
            row.extend(patch.clone());
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, relation: Relation, query: &Query) -> Result<u64, GatewayError> {
        let mut state = self.state.lock().await;
        state.check_writable(relation)?;

        let key = relation.primary_key();
        let doomed: Vec<Value> = state
            .table(relation)
            .iter()
            .filter(|r| matches(r, query))
            .filter_map(|r| r.get(key).cloned())
            .collect();
        state.check_not_referenced(relation, &doomed)?;

        let table = state.table(relation);
        let before = table.len();
        table.retain(|r| !matches(r, query));
        Ok(u64::try_from(before - table.len()).unwrap_or(u64::MAX))
    }
}

// =============================================================================
// Row semantics
// =============================================================================

fn column_defaults(relation: Relation) -> Vec<(&'static str, Value)> {
    match relation {
        Relation::Vehicles => vec![("vehicle_type", json!("sedan"))],
        Relation::Services => vec![("is_active", json!(true))],
        Relation::Bookings => vec![("status", json!("pending")), ("notes", json!(""))],
        Relation::VendorProfiles => vec![("is_mobile", json!(true)), ("service_radius", json!(10))],
        Relation::Profiles | Relation::VendorServiceAreas | Relation::Reviews => Vec::new(),
    }
}

fn has_value(row: &Row, column: &str) -> bool {
    row.get(column).is_some_and(|v| !v.is_null())
}

fn matches(row: &Row, query: &Query) -> bool {
    query.filters().iter().all(|filter| match filter {
        Filter::Eq(column, Value::Null) => !has_value(row, column),
        Filter::Eq(column, value) => row.get(column).is_some_and(|v| values_equal(v, value)),
        Filter::In(column, values) => row
            .get(column)
            .is_some_and(|v| values.iter().any(|candidate| values_equal(v, candidate))),
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Nulls compare greater than every value.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
