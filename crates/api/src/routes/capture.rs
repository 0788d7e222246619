//! Capture Routes
//!
//! The dashboard owns the camera; it reports the permission outcome and
//! pushes encoded stills here.

use axum::{extract::State, Json};
use media_capture::CaptureState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct PermissionRequest {
    pub granted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    /// `data:image/...;base64,...`
    pub data_uri: String,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub capture: CaptureState,
}

#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub sequence: u64,
}

/// Record the permission outcome
pub async fn set_permission(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PermissionRequest>,
) -> Json<CaptureResponse> {
    state.session.set_permission(request.granted);
    Json(CaptureResponse {
        capture: state.session.status().capture,
    })
}

/// Store the latest still
pub async fn push_frame(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FrameRequest>,
) -> Result<Json<FrameResponse>, ApiError> {
    let sequence = state.session.push_frame(&request.data_uri)?;
    Ok(Json(FrameResponse { sequence }))
}

pub async fn pause(State(state): State<Arc<AppState>>) -> Json<CaptureResponse> {
    state.session.pause_capture();
    Json(CaptureResponse {
        capture: state.session.status().capture,
    })
}

pub async fn resume(State(state): State<Arc<AppState>>) -> Json<CaptureResponse> {
    state.session.resume_capture();
    Json(CaptureResponse {
        capture: state.session.status().capture,
    })
}
