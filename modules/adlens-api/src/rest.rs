use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use adlens_common::{AdType, AdlensError};
use adlens_scraper::traits::RunStore;
use adlens_scraper::RunStatus;

use crate::AppState;

#[derive(Deserialize)]
pub struct StartRunRequest {
    pub target_url: String,
    pub organisation_id: Uuid,
    pub ad_type: AdType,
}

/// POST /api/runs: submit a scrape and return immediately with the
/// provider-issued run id. Results land asynchronously.
pub async fn api_start_run(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartRunRequest>,
) -> impl IntoResponse {
    match state
        .gate
        .start_run(&body.target_url, body.organisation_id, body.ad_type)
        .await
    {
        Ok(run_id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "run_id": run_id })),
        )
            .into_response(),
        Err(e) => {
            let status = match &e {
                AdlensError::Validation(_) => StatusCode::BAD_REQUEST,
                AdlensError::Provider(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!(organisation_id = %body.organisation_id, error = %e, "Run submission rejected");
            // Validation messages are safe to echo; everything else gets a
            // generic body so provider/database details stay out of responses.
            let message = match &e {
                AdlensError::Validation(msg) => msg.clone(),
                AdlensError::Provider(_) => "scrape provider rejected the submission".to_string(),
                _ => "internal error".to_string(),
            };
            (status, Json(serde_json::json!({ "error": message }))).into_response()
        }
    }
}

/// Body of GET /api/runs/status: the scheduler's snapshot plus the count
/// of incomplete runs no loop is watching.
#[derive(Serialize)]
pub struct RunStatusResponse {
    #[serde(flatten)]
    pub polling: RunStatus,
    pub stale_incomplete: usize,
}

/// GET /api/runs/status: in-flight poll loops plus a count of runs that
/// started but never completed (abandoned by timeout or a crashed process).
pub async fn api_run_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.scheduler.status();
    let incomplete = match state.runs.count_incomplete().await {
        Ok(n) => n.max(0) as usize,
        Err(e) => {
            warn!(error = %e, "Incomplete-run count failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    // Incomplete runs no poll loop is watching: abandoned by timeout or
    // orphaned by a restart.
    let stale_incomplete = incomplete.saturating_sub(status.active_count);

    Json(RunStatusResponse {
        polling: status,
        stale_incomplete,
    })
    .into_response()
}
