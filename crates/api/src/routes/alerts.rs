//! Alert and Notice Routes

use alerting::{Notice, ToneSpec, CUE_SAMPLE_RATE};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct AcknowledgeResponse {
    /// `false` when no alert was active
    pub acknowledged: bool,
}

#[derive(Debug, Serialize)]
pub struct NoticeResponse {
    pub data: Vec<Notice>,
    pub count: usize,
}

/// Driver acknowledged the drowsiness alert
pub async fn acknowledge(State(state): State<Arc<AppState>>) -> Json<AcknowledgeResponse> {
    Json(AcknowledgeResponse {
        acknowledged: state.session.acknowledge(),
    })
}

/// The drowsiness buzzer, played by the dashboard when an alert is raised
pub async fn buzzer() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "audio/wav")],
        ToneSpec::BUZZER.to_wav(CUE_SAMPLE_RATE),
    )
}

/// Get visible notices
pub async fn get_notices(State(state): State<Arc<AppState>>) -> Json<NoticeResponse> {
    let notices = state.session.notices();
    Json(NoticeResponse {
        count: notices.len(),
        data: notices,
    })
}

pub async fn dismiss_notice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.session.dismiss_notice(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No dismissable notice {}", id)))
    }
}
