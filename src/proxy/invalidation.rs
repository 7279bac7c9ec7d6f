//! Cache keys and invalidation-key extraction.
//!
//! A mutation of employee `n` invalidates exactly `GET:/employee/n`. List
//! pages are left to expire with the TTL.

use axum::http::Method;
use serde::Deserialize;

/// Errors deriving an invalidation key from a write.
#[derive(Debug, thiserror::Error)]
pub enum InvalidationError {
    #[error("request body is not an employee record: {0}")]
    Body(#[from] serde_json::Error),

    #[error("path '{0}' does not name an employee")]
    Path(String),
}

/// Only the id matters here; other fields are ignored.
#[derive(Debug, Deserialize)]
struct RecordRef {
    #[serde(default)]
    id: Option<i64>,
}

/// Cache key for a request: `METHOD:path?query`.
pub fn cache_key(method: &Method, path_and_query: &str) -> String {
    format!("{}:{}", method, path_and_query)
}

/// Cache key of the single-record read for `id`.
pub fn employee_read_key(id: i64) -> String {
    format!("GET:/employee/{}", id)
}

/// The cache key a write makes stale, if any.
///
/// PUT and POST carry the id in the JSON body; a create without an id has
/// nothing cached yet. DELETE carries it in the path.
pub fn invalidation_key(
    method: &Method,
    path: &str,
    body: &[u8],
) -> Result<Option<String>, InvalidationError> {
    match *method {
        Method::PUT | Method::POST => {
            let record: RecordRef = serde_json::from_slice(body)?;
            Ok(record.id.map(employee_read_key))
        }
        Method::DELETE => employee_id_from_path(path).map(|id| Some(employee_read_key(id))),
        _ => Ok(None),
    }
}

/// Parse `/employee/{id}`.
pub fn employee_id_from_path(path: &str) -> Result<i64, InvalidationError> {
    path.strip_prefix("/employee/")
        .map(|rest| rest.trim_end_matches('/'))
        .and_then(|rest| rest.parse::<i64>().ok())
        .ok_or_else(|| InvalidationError::Path(path.to_string()))
}
