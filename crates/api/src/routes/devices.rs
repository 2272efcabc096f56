//! Device Routes

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::{error::ApiError, AppState};
use storage::{now, Device, NewDevice};

/// Query parameters for the heartbeat endpoint
#[derive(Debug, Deserialize)]
pub struct HeartbeatQuery {
    /// New status; left unchanged when absent
    pub status: Option<String>,
}

/// GET /devices
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(state.repository.list_devices().await?))
}

/// POST /devices
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewDevice>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    let Json(device) = payload?;
    state.validator.validate_device(&device)?;

    let device = state.repository.insert_device(device).await?;
    metrics::counter!("secops_devices_registered_total").increment(1);
    info!("Registered device {}", device.id);

    Ok((StatusCode::CREATED, Json(device)))
}

/// POST /devices/:id/heartbeat
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<HeartbeatQuery>, QueryRejection>,
) -> Result<Json<Device>, ApiError> {
    let Query(query) = query?;

    let device = state
        .repository
        .record_heartbeat(&id, query.status, now())
        .await?;
    metrics::counter!("secops_heartbeats_total").increment(1);

    Ok(Json(device))
}
