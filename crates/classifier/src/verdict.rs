//! Per-frame classification result

use serde::{Deserialize, Serialize};

/// One classification result for one frame. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationVerdict {
    /// Driver's eyes judged closed
    pub is_drowsy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
    /// Explicit emotion label, when the backend provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_label: Option<String>,
    /// Free-text analysis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    /// Spoken rendition of `alert_message`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data_uri: Option<String>,
}

impl ClassificationVerdict {
    pub fn drowsy(alert_message: Option<String>) -> Self {
        Self {
            is_drowsy: true,
            alert_message,
            ..Default::default()
        }
    }

    pub fn awake() -> Self {
        Self::default()
    }

    pub fn emotion(summary_text: impl Into<String>) -> Self {
        Self {
            summary_text: Some(summary_text.into()),
            ..Default::default()
        }
    }

    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            emotion_label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio_data_uri.is_some()
    }
}
