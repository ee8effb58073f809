//! Sensor Routes

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sensor_store::{Coordinate, TagInput};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiError, AppState};

const ID_NOT_ALLOWED: &str = "id is not allowed in sensor creation";
const INVALID_ID: &str = "sensor id must be a valid UUID";

/// Query parameters for `GET /sensor`
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Exact sensor name; lists a page of sensors when absent
    pub name: Option<String>,
}

/// Query parameters for `POST /sensor`
#[derive(Debug, Deserialize)]
pub struct UpdateQuery {
    /// Current name of the sensor to update
    pub name: Option<String>,
}

/// Request body for create and update
#[derive(Debug, Deserialize)]
pub struct SensorPayload {
    /// Must be absent on create; ignored on update
    pub id: Option<Uuid>,
    pub name: String,
    pub location: Coordinate,
    #[serde(default)]
    pub tags: Vec<TagInput>,
}

impl SensorPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("sensor name is required".to_string()));
        }
        if !self.location.is_finite() {
            return Err(ApiError::BadRequest("invalid coordinates input".to_string()));
        }
        Ok(())
    }
}

fn parse_body(payload: Result<Json<SensorPayload>, JsonRejection>) -> Result<SensorPayload, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    payload.validate()?;
    Ok(payload)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(INVALID_ID.to_string()))
}

/// Look up a sensor by name, or list a page of sensors
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    match params.name {
        Some(name) => {
            metrics::counter!("sensor_api_requests_total", "route" => "get_by_name").increment(1);
            let sensor = state
                .store
                .get_by_name(&name)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("sensor '{}' not found", name)))?;
            Ok(Json(sensor).into_response())
        }
        None => {
            metrics::counter!("sensor_api_requests_total", "route" => "list").increment(1);
            let sensors = state.store.get_all().await?;
            Ok(Json(sensors).into_response())
        }
    }
}

/// Get a sensor by id
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    metrics::counter!("sensor_api_requests_total", "route" => "get_by_id").increment(1);
    let id = parse_id(&id)?;
    let sensor = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("sensor {} not found", id)))?;
    Ok(Json(sensor).into_response())
}

/// Get the tags of a sensor by id
pub async fn get_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    metrics::counter!("sensor_api_requests_total", "route" => "get_tags").increment(1);
    let id = parse_id(&id)?;
    let sensor = state
        .store
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("sensor {} not found", id)))?;
    Ok(Json(sensor.tags).into_response())
}

/// Register a new sensor
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SensorPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    metrics::counter!("sensor_api_requests_total", "route" => "create").increment(1);
    let payload = parse_body(payload)?;
    if payload.id.is_some() {
        return Err(ApiError::BadRequest(ID_NOT_ALLOWED.to_string()));
    }

    let sensor = state
        .store
        .create(&payload.name, payload.location, &payload.tags)
        .await?;
    Ok((StatusCode::CREATED, Json(sensor)).into_response())
}

/// Rename, relocate and retag the sensor named in the query string
pub async fn update(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpdateQuery>,
    payload: Result<Json<SensorPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    metrics::counter!("sensor_api_requests_total", "route" => "update").increment(1);
    let name = params
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("query parameter 'name' is required".to_string()))?;
    let payload = parse_body(payload)?;

    let sensor = state
        .store
        .update(&name, &payload.name, payload.location, &payload.tags)
        .await?;
    Ok(Json(sensor).into_response())
}
