//! Session, Mitigation and Summary Routes

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use classifier::SessionSample;
use serde::{Deserialize, Serialize};
use session::SessionStatus;
use std::sync::Arc;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: SessionStatus,
    /// Mitigation audio currently playing, for the dashboard to render
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    /// `false` when no session was running
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
pub struct MitigationResponse {
    /// `false` when a mitigation was already in flight
    pub dispatched: bool,
}

/// Explicit batch; either field falls back to the recorded session when absent
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub emotion_data: Option<Vec<SessionSample>>,
    pub drowsiness_alerts: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

fn status_response(state: &AppState) -> StatusResponse {
    StatusResponse {
        status: state.session.status(),
        now_playing: state.player.now_playing(),
    }
}

pub async fn start(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    state.session.start()?;
    Ok(Json(status_response(&state)))
}

pub async fn stop(State(state): State<Arc<AppState>>) -> Json<StopResponse> {
    Json(StopResponse {
        stopped: state.session.stop(),
    })
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(status_response(&state))
}

/// Manual cheer-up
pub async fn trigger_mitigation(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<MitigationResponse>) {
    let dispatched = state.session.trigger_mitigation();
    let code = if dispatched {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    (code, Json(MitigationResponse { dispatched }))
}

/// An empty body means "use the recorded session"; anything else must parse
fn parse_summary_request(body: &[u8]) -> Result<SummaryRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SummaryRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid summary request: {}", e)))
}

/// Summarize an explicit batch or the recorded session
pub async fn summarize(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SummaryResponse>, ApiError> {
    let request = parse_summary_request(&body)?;
    let (recorded_samples, recorded_alerts) = state.session.recorded();
    let samples = request.emotion_data.unwrap_or(recorded_samples);
    let alerts = request.drowsiness_alerts.unwrap_or(recorded_alerts);

    let summary = state
        .session
        .client()
        .summarize_session(&samples, &alerts)
        .await?;
    Ok(Json(SummaryResponse { summary }))
}
