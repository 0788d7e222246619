//! Session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sampling cadence and alert voicing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Drowsiness sampler period (milliseconds)
    pub drowsiness_period_ms: u64,
    /// Emotion sampler period (milliseconds)
    pub emotion_period_ms: u64,
    /// Attach a spoken rendition to drowsiness alerts
    pub speak_alerts: bool,
    /// Stills older than this are not sampled (milliseconds)
    pub max_frame_age_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            drowsiness_period_ms: 1000,
            emotion_period_ms: 5000,
            speak_alerts: true,
            max_frame_age_ms: 5000,
        }
    }
}

impl SessionConfig {
    pub fn drowsiness_period(&self) -> Duration {
        Duration::from_millis(self.drowsiness_period_ms.max(1))
    }

    pub fn emotion_period(&self) -> Duration {
        Duration::from_millis(self.emotion_period_ms.max(1))
    }

    pub fn max_frame_age(&self) -> Duration {
        Duration::from_millis(self.max_frame_age_ms)
    }
}
