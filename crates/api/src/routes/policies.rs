//! Policy Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use policy_engine::Policy;
use std::sync::Arc;
use tracing::info;

use crate::{error::ApiError, AppState};

/// GET /policies
pub async fn list_policies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Policy>>, ApiError> {
    Ok(Json(state.repository.list_policies().await?))
}

/// POST /policies
pub async fn create_policy(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Policy>, JsonRejection>,
) -> Result<(StatusCode, Json<Policy>), ApiError> {
    let Json(policy) = payload?;
    state.validator.validate_policy(&policy)?;

    let policy = state.repository.insert_policy(policy).await?;
    metrics::counter!("secops_policies_created_total").increment(1);
    info!(
        "Created policy '{}' ({} actions, enabled: {})",
        policy.name,
        policy.actions.len(),
        policy.enabled
    );

    Ok((StatusCode::CREATED, Json(policy)))
}
