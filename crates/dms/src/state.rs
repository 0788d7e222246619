//! Driver state tracking

use crate::emotion::Emotion;
use serde::{Deserialize, Serialize};

/// Debouncer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrowsinessPhase {
    /// No drowsy run in progress
    #[default]
    Watching,
    /// Drowsy run shorter than the threshold
    Suspect,
    /// Alert raised and not yet cleared
    Alerting,
}

/// Debounced drowsiness state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrowsinessState {
    /// Length of the current run of drowsy verdicts
    pub consecutive_drowsy_count: u32,

    /// Alert raised and not yet cleared
    pub alert_active: bool,

    /// Message of the active alert, empty when inactive
    pub alert_message: String,
}

impl DrowsinessState {
    pub fn phase(&self) -> DrowsinessPhase {
        if self.alert_active {
            DrowsinessPhase::Alerting
        } else if self.consecutive_drowsy_count > 0 {
            DrowsinessPhase::Suspect
        } else {
            DrowsinessPhase::Watching
        }
    }

    /// Reset state (acknowledgement or session stop)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Mitigation guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationState {
    #[default]
    Idle,
    InFlight,
}

/// Mood tracker state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodState {
    pub current_emotion: Emotion,
    pub mitigation: MitigationState,
}

impl MoodState {
    pub fn mitigation_in_flight(&self) -> bool {
        self.mitigation == MitigationState::InFlight
    }
}
