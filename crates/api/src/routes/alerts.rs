//! Alert Routes

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::{error::ApiError, AppState};
use storage::{Alert, NewAlert};

/// Query parameters for the alert listing
#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    /// Filter by processed flag
    pub processed: Option<bool>,
    /// Maximum number of records
    pub limit: Option<usize>,
}

/// GET /alerts
///
/// Newest first.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AlertQuery>, QueryRejection>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let Query(params) = query?;

    let alerts = state
        .repository
        .list_alerts()
        .await?
        .into_iter()
        .filter(|a| params.processed.map_or(true, |p| a.processed == p))
        .take(params.limit.unwrap_or(usize::MAX))
        .collect();

    Ok(Json(alerts))
}

/// POST /alerts
///
/// Stores the alert unprocessed; no policies are evaluated.
pub async fn receive_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewAlert>, JsonRejection>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    let Json(new) = payload?;
    state.validator.validate_alert(&new)?;

    let alert = state.repository.insert_alert(Alert::received(new)).await?;
    metrics::counter!("secops_alerts_received_total").increment(1);
    info!(
        "Received alert {} ({}/{}, severity {})",
        alert.id, alert.source, alert.rule_id, alert.severity
    );

    Ok((StatusCode::CREATED, Json(alert)))
}

/// POST /alerts/process
///
/// Evaluates the alert against every enabled policy and stores it with the
/// resulting decision.
pub async fn process_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewAlert>, JsonRejection>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    let Json(new) = payload?;
    state.validator.validate_alert(&new)?;

    let policies = state.repository.enabled_policies().await?;
    let actions = policy_engine::evaluate(&new.facts(), &policies);
    let action_count = actions.len();

    let alert = state
        .repository
        .insert_alert(Alert::processed(new, actions))
        .await?;
    metrics::counter!("secops_alerts_processed_total").increment(1);
    metrics::counter!("secops_actions_emitted_total").increment(action_count as u64);
    info!(
        "Processed alert {} against {} policies: {} actions",
        alert.id,
        policies.len(),
        action_count
    );

    Ok((StatusCode::CREATED, Json(alert)))
}
