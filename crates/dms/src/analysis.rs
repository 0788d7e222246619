//! DMS status snapshot

use crate::emotion::Emotion;
use crate::state::{DrowsinessPhase, MitigationState};
use serde::Serialize;

/// Point-in-time view of the driver state, as shown on the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStatus {
    pub phase: DrowsinessPhase,
    pub consecutive_drowsy_count: u32,
    pub alert_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
    pub emotion: Emotion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_analysis: Option<String>,
    pub mitigation: MitigationState,
}
