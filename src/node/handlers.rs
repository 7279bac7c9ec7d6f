//! Node request handlers.
//!
//! Paths and bodies are parsed by hand so malformed input comes back as the
//! same `{"error": ...}` body as every other failure.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::response::ApiError;
use crate::node::NodeState;
use crate::store::{Employee, NewEmployee};

/// Default page size for `GET /employees`.
pub const DEFAULT_LIMIT: u32 = 10;

/// Raw `offset`/`limit` query values.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    /// `(offset, limit)`, defaulting to `(0, 10)`.
    pub fn window(&self) -> Result<(u32, u32), ApiError> {
        let offset = parse_param("offset", self.offset.as_deref(), 0)?;
        let limit = parse_param("limit", self.limit.as_deref(), DEFAULT_LIMIT)?;
        Ok((offset, limit))
    }
}

fn parse_param(name: &str, raw: Option<&str>, default: u32) -> Result<u32, ApiError> {
    match raw {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid {} '{}'", name, value))),
    }
}

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid employee id '{}'", raw)))
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid employee record: {}", e)))
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub role: String,
    pub port: u16,
    pub timestamp: DateTime<Utc>,
}

pub async fn get_employee(
    State(state): State<NodeState>,
    Path(id): Path<String>,
) -> Result<Json<Employee>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.get_by_id(id).await?))
}

pub async fn list_employees(
    State(state): State<NodeState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (offset, limit) = params.window()?;
    Ok(Json(state.store.get_all(offset, limit).await?))
}

pub async fn create_employee(
    State(state): State<NodeState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let employee: NewEmployee = parse_body(&body)?;
    let id = state.store.add(&employee).await?;
    tracing::info!(id, name = %employee.name, "Employee created");
    Ok((
        StatusCode::OK,
        Json(Created {
            id,
            message: "Employee added to primary. Replicating to replicas...".to_string(),
        }),
    ))
}

pub async fn update_employee(
    State(state): State<NodeState>,
    body: Bytes,
) -> Result<Json<Message>, ApiError> {
    let employee: Employee = parse_body(&body)?;
    state.store.update(&employee).await?;
    tracing::info!(id = employee.id, "Employee updated");
    Ok(Json(Message {
        message: "Employee updated on primary. Replicating to replicas...".to_string(),
    }))
}

pub async fn delete_employee(
    State(state): State<NodeState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    let id = parse_id(&id)?;
    state.store.delete(id).await?;
    tracing::info!(id, "Employee deleted");
    Ok(Json(Message {
        message: "Employee deleted from primary. Replicating to replicas...".to_string(),
    }))
}

pub async fn health(State(state): State<NodeState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        role: state.store.role().to_string(),
        port: state.port,
        timestamp: Utc::now(),
    })
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
