//! DMS configuration

use serde::{Deserialize, Serialize};

/// Shown when a positive verdict carries no message of its own
pub const DEFAULT_ALERT_MESSAGE: &str = "Drowsiness detected! Please take a break.";

/// How an active drowsiness alert is cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertClearPolicy {
    /// Only driver acknowledgement or session stop clears the alert
    #[default]
    Acknowledge,
    /// A not-drowsy verdict also clears the alert
    AutoClear,
}

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Consecutive drowsy verdicts required to raise an alert
    pub drowsy_threshold: u32,

    /// Alert clearing policy
    pub clear_policy: AlertClearPolicy,

    /// Fallback alert text
    pub default_alert_message: String,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            drowsy_threshold: 2,
            clear_policy: AlertClearPolicy::Acknowledge,
            default_alert_message: DEFAULT_ALERT_MESSAGE.to_string(),
        }
    }
}

impl DmsConfig {
    /// Create strict config (alert on the first drowsy frame)
    pub fn strict() -> Self {
        Self {
            drowsy_threshold: 1,
            ..Default::default()
        }
    }

    /// Create lenient config (longer run required, alert clears itself)
    pub fn lenient() -> Self {
        Self {
            drowsy_threshold: 3,
            clear_policy: AlertClearPolicy::AutoClear,
            ..Default::default()
        }
    }

    /// Threshold with the zero case folded to one
    pub fn effective_threshold(&self) -> u32 {
        self.drowsy_threshold.max(1)
    }
}
