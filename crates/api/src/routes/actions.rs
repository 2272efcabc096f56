//! Drone Action Routes
//!
//! Command stubs: requests are acknowledged and logged, nothing is sent to a
//! flight controller.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::{error::ApiError, AppState};

fn default_mode() -> String {
    "RTL".to_string()
}

/// Return-to-home request
#[derive(Debug, Deserialize)]
pub struct RthRequest {
    pub drone_id: String,
    /// Flight mode to switch to
    #[serde(default = "default_mode")]
    pub mode: String,
}

/// Acknowledgement of a dispatched command
#[derive(Debug, Serialize)]
pub struct CommandAck {
    pub drone_id: String,
    pub mode: String,
    pub status: &'static str,
}

/// POST /actions/rth
pub async fn return_to_home(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RthRequest>, JsonRejection>,
) -> Result<Json<CommandAck>, ApiError> {
    let Json(request) = payload?;
    state.validator.validate_identifier("drone_id", &request.drone_id)?;
    state.validator.validate_required("mode", &request.mode)?;

    metrics::counter!("secops_rth_commands_total").increment(1);
    info!("RTH command for drone {} (mode {})", request.drone_id, request.mode);

    Ok(Json(CommandAck {
        drone_id: request.drone_id,
        mode: request.mode,
        status: "sent",
    }))
}
