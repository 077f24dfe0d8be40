//! Hosted backend data API client.
//!
//! Speaks the `PostgREST` dialect served at `{PROJECT_URL}/rest/v1/{relation}`,
//! authenticated with the service-role key. Filters become query
//! parameters (`col=eq.v`, `col=in.("a","b")`, `order=col.desc`,
//! `limit=n`); writes ask for `return=representation` so the stored rows
//! come back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, header};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{
    ConflictResolution, DataGateway, Direction, Filter, GatewayError, GatewayErrorKind,
    OnConflict, Query, Relation, Row,
};
use crate::config::StoreConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors constructing a [`PostgrestGateway`].
#[derive(Debug, thiserror::Error)]
pub enum PostgrestSetupError {
    #[error("project url cannot carry a path: {0}")]
    InvalidUrl(String),
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`DataGateway`] over the hosted REST data API.
#[derive(Clone)]
pub struct PostgrestGateway {
    client: reqwest::Client,
    rest_base: Url,
    service_role_key: secrecy::SecretString,
}

/// Error body returned by the data API.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl PostgrestGateway {
    /// Build a gateway for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project URL cannot be a base or the HTTP
    /// client cannot be built.
    pub fn new(store: &StoreConfig) -> Result<Self, PostgrestSetupError> {
        let mut rest_base = store.url.clone();
        rest_base
            .path_segments_mut()
            .map_err(|()| PostgrestSetupError::InvalidUrl(store.url.to_string()))?
            .pop_if_empty()
            .extend(["rest", "v1"]);

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            rest_base,
            service_role_key: store.service_role_key.clone(),
        })
    }

    /// Endpoint for one relation.
    fn relation_url(&self, relation: Relation) -> Url {
        let mut url = self.rest_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(relation.as_str());
        }
        url
    }

    fn request(
        &self,
        method: Method,
        relation: Relation,
        params: &[(String, String)],
    ) -> reqwest::RequestBuilder {
        let mut url = self.relation_url(relation);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        let key = self.service_role_key.expose_secret();
        self.client
            .request(method, url)
            .header("apikey", key)
            .header(header::AUTHORIZATION, format!("Bearer {key}"))
            .header(header::ACCEPT, "application/json")
    }

    /// Send and decode a JSON array of rows.
    async fn send_rows(
        &self,
        relation: Relation,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<Row>, GatewayError> {
        let response = request.send().await.map_err(|e| transport_error(relation, &e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(relation, &e))?;

        if !status.is_success() {
            return Err(error_from_response(relation, status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(GatewayError::new(
                        GatewayErrorKind::Malformed,
                        relation,
                        format!("expected row object, got {other}"),
                    )),
                })
                .collect(),
            Ok(Value::Object(row)) => Ok(vec![row]),
            Ok(other) => Err(GatewayError::new(
                GatewayErrorKind::Malformed,
                relation,
                format!("expected rows, got {other}"),
            )),
            Err(e) => Err(GatewayError::new(
                GatewayErrorKind::Malformed,
                relation,
                e.to_string(),
            )),
        }
    }
}

#[async_trait]
impl DataGateway for PostgrestGateway {
    #[instrument(skip(self, query), fields(relation = %relation))]
    async fn select(&self, relation: Relation, query: &Query) -> Result<Vec<Row>, GatewayError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(encode_query(query));
        let request = self.request(Method::GET, relation, &params);
        self.send_rows(relation, request).await
    }

    #[instrument(skip(self, record), fields(relation = %relation))]
    async fn insert(&self, relation: Relation, record: Row) -> Result<Row, GatewayError> {
        let request = self
            .request(Method::POST, relation, &[])
            .header("Prefer", "return=representation")
            .json(&record);
        self.send_rows(relation, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                GatewayError::new(
                    GatewayErrorKind::Malformed,
                    relation,
                    "insert returned no row",
                )
            })
    }

    #[instrument(skip(self, record), fields(relation = %relation, key = on_conflict.key))]
    async fn upsert(
        &self,
        relation: Relation,
        record: Row,
        on_conflict: OnConflict,
    ) -> Result<Option<Row>, GatewayError> {
        let resolution = match on_conflict.resolution {
            ConflictResolution::MergeDuplicates => "merge-duplicates",
            ConflictResolution::IgnoreDuplicates => "ignore-duplicates",
        };
        let params = [("on_conflict".to_string(), on_conflict.key.to_string())];
        let request = self
            .request(Method::POST, relation, &params)
            .header(
                "Prefer",
                format!("resolution={resolution},return=representation"),
            )
            .json(&record);
        Ok(self.send_rows(relation, request).await?.into_iter().next())
    }

    #[instrument(skip(self, patch, query), fields(relation = %relation))]
    async fn update(
        &self,
        relation: Relation,
        patch: Row,
        query: &Query,
    ) -> Result<u64, GatewayError> {
        let request = self
            .request(Method::PATCH, relation, &encode_query(query))
            .header("Prefer", "return=representation")
            .json(&patch);
        Ok(row_count(&self.send_rows(relation, request).await?))
    }

    #[instrument(skip(self, query), fields(relation = %relation))]
    async fn delete(&self, relation: Relation, query: &Query) -> Result<u64, GatewayError> {
        let request = self
            .request(Method::DELETE, relation, &encode_query(query))
            .header("Prefer", "return=representation");
        Ok(row_count(&self.send_rows(relation, request).await?))
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Render a query as data API parameters.
fn encode_query(query: &Query) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .filters()
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, Value::Null) => (column.clone(), "is.null".to_string()),
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", scalar(value))),
            Filter::In(column, values) => {
                let list: Vec<String> = values.iter().map(quoted).collect();
                (column.clone(), format!("in.({})", list.join(",")))
            }
        })
        .collect();

    if !query.ordering().is_empty() {
        let order: Vec<String> = query
            .ordering()
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    Direction::Ascending => "asc",
                    Direction::Descending => "desc",
                };
                format!("{}.{dir}", o.column)
            })
            .collect();
        params.push(("order".to_string(), order.join(",")));
    }

    if let Some(limit) = query.row_limit() {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// List element; strings are double-quoted so commas and parens survive.
fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

fn row_count(rows: &[Row]) -> u64 {
    u64::try_from(rows.len()).unwrap_or(u64::MAX)
}

// =============================================================================
// Error classification
// =============================================================================

fn transport_error(relation: Relation, err: &reqwest::Error) -> GatewayError {
    GatewayError::new(GatewayErrorKind::Unavailable, relation, err.to_string())
}

/// Classify a non-success response.
fn error_from_response(relation: Relation, status: StatusCode, body: &str) -> GatewayError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();

    let kind = parsed.code.as_deref().map_or_else(
        || match status {
            StatusCode::NOT_FOUND => GatewayErrorKind::SchemaMissing,
            StatusCode::CONFLICT => GatewayErrorKind::Constraint,
            s if s.is_server_error() => GatewayErrorKind::Unavailable,
            _ => GatewayErrorKind::Unknown,
        },
        GatewayError::classify,
    );

    let mut message = parsed
        .message
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    for extra in [parsed.details, parsed.hint].into_iter().flatten() {
        message.push_str(": ");
        message.push_str(&extra);
    }

    let error = GatewayError::new(kind, relation, message);
    match parsed.code {
        Some(code) => error.with_code(code),
        None => error,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;

    fn gateway() -> PostgrestGateway {
        PostgrestGateway::new(&StoreConfig {
            url: Url::parse("https://project.supabase.co").unwrap(),
            service_role_key: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"),
        })
        .unwrap()
    }

    #[test]
    fn test_relation_url() {
        let url = gateway().relation_url(Relation::VendorServiceAreas);
        assert_eq!(
            url.as_str(),
            "https://project.supabase.co/rest/v1/vendor_service_areas"
        );
    }

    #[test]
    fn test_encode_filters() {
        let query = Query::new()
            .eq("vendor_id", "v-1")
            .eq("is_active", true)
            .eq("deleted_at", Value::Null)
            .any_of("id", ["a", "b,c"]);
        let params = encode_query(&query);
        assert_eq!(
            params,
            vec![
                ("vendor_id".to_string(), "eq.v-1".to_string()),
                ("is_active".to_string(), "eq.true".to_string()),
                ("deleted_at".to_string(), "is.null".to_string()),
                ("id".to_string(), "in.(\"a\",\"b,c\")".to_string()),
            ]
        );
    }

    #[test]
    fn test_encode_order_and_limit() {
        let query = Query::new()
            .order_by("created_at", Direction::Descending)
            .order_by("price", Direction::Ascending)
            .limit(5);
        let params = encode_query(&query);
        assert_eq!(
            params,
            vec![
                ("order".to_string(), "created_at.desc,price.asc".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_encode_numeric_in() {
        let query = Query::new().any_of("rating", [json!(4), json!(5)]);
        assert_eq!(encode_query(&query)[0].1, "in.(4,5)");
    }

    #[test]
    fn test_error_missing_relation() {
        let body = r#"{"code":"42P01","message":"relation \"public.vehicles\" does not exist","details":null,"hint":null}"#;
        let err = error_from_response(Relation::Vehicles, StatusCode::NOT_FOUND, body);
        assert_eq!(err.kind, GatewayErrorKind::SchemaMissing);
        assert_eq!(err.code.as_deref(), Some("42P01"));
        assert!(err.message.contains("does not exist"));
    }

    #[test]
    fn test_error_schema_cache() {
        let body = r#"{"code":"PGRST205","message":"Could not find the table 'public.bookings' in the schema cache","hint":"Perhaps you meant the table 'public.reviews'"}"#;
        let err = error_from_response(Relation::Bookings, StatusCode::NOT_FOUND, body);
        assert_eq!(err.kind, GatewayErrorKind::SchemaMissing);
        assert!(err.message.contains("Perhaps you meant"));
    }

    #[test]
    fn test_error_unique_violation() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint \"profiles_pkey\"","details":"Key (id)=(x) already exists."}"#;
        let err = error_from_response(Relation::Profiles, StatusCode::CONFLICT, body);
        assert_eq!(err.kind, GatewayErrorKind::Constraint);
        assert!(err.message.contains("already exists"));
    }

    #[test]
    fn test_error_without_body() {
        let err = error_from_response(Relation::Reviews, StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.kind, GatewayErrorKind::Unavailable);
        assert_eq!(err.message, "HTTP 502");
        assert!(err.code.is_none());
    }
}
