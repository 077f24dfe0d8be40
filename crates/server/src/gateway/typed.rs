//! Typed encode/decode between domain records and gateway rows.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{DataGateway, GatewayError, GatewayErrorKind, Query, Relation, Row};

/// Encode a record as a row.
///
/// # Errors
///
/// Returns a `Malformed` error if `value` does not serialize to a JSON object.
pub fn to_row<T: Serialize>(relation: Relation, value: &T) -> Result<Row, GatewayError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(GatewayError::new(
            GatewayErrorKind::Malformed,
            relation,
            format!("expected an object, got {other}"),
        )),
        Err(e) => Err(GatewayError::new(
            GatewayErrorKind::Malformed,
            relation,
            e.to_string(),
        )),
    }
}

/// Decode a row into a record.
///
/// # Errors
///
/// Returns a `Malformed` error naming the relation if the row does not fit `T`.
pub fn from_row<T: DeserializeOwned>(relation: Relation, row: Row) -> Result<T, GatewayError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| GatewayError::new(GatewayErrorKind::Malformed, relation, e.to_string()))
}

/// [`DataGateway::select`], decoded.
///
/// # Errors
///
/// Propagates gateway errors and decode failures.
pub async fn select_as<T: DeserializeOwned>(
    gateway: &dyn DataGateway,
    relation: Relation,
    query: &Query,
) -> Result<Vec<T>, GatewayError> {
    gateway
        .select(relation, query)
        .await?
        .into_iter()
        .map(|row| from_row(relation, row))
        .collect()
}

/// [`DataGateway::select_one`], decoded.
///
/// # Errors
///
/// Propagates gateway errors (including `NotFound`) and decode failures.
pub async fn select_one_as<T: DeserializeOwned>(
    gateway: &dyn DataGateway,
    relation: Relation,
    query: &Query,
) -> Result<T, GatewayError> {
    from_row(relation, gateway.select_one(relation, query).await?)
}

/// [`DataGateway::insert`] of a typed record, decoding the stored row.
///
/// # Errors
///
/// Propagates gateway errors and encode/decode failures.
pub async fn insert_as<T: DeserializeOwned>(
    gateway: &dyn DataGateway,
    relation: Relation,
    record: &impl Serialize,
) -> Result<T, GatewayError> {
    let row = to_row(relation, record)?;
    from_row(relation, gateway.insert(relation, row).await?)
}
