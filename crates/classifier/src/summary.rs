//! Post-drive session summary

use crate::backend::Flow;
use crate::wire::SummaryResponse;
use crate::{ClassifierClient, ClassifierError};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::info;

/// Rendered when the drive raised no drowsiness alerts
pub const NO_ALERTS_LINE: &str = "No drowsiness alerts were triggered during the drive.";
/// Rendered when the drive recorded no emotion samples
pub const NO_SAMPLES_LINE: &str = "No emotion samples were recorded during the drive.";

/// Current time in the format used for samples and alert timestamps
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One timestamped emotion observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSample {
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub emotion: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
}

impl SessionSample {
    pub fn new(timestamp: impl Into<String>, emotion: impl Into<String>, confidence: f32) -> Self {
        Self {
            timestamp: timestamp.into(),
            emotion: emotion.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Sample stamped with the current time
    pub fn now(emotion: impl Into<String>, confidence: f32) -> Self {
        Self::new(timestamp_now(), emotion, confidence)
    }
}

/// Summary flow input: the raw batch plus a prompt that spells out empty sections
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub emotion_data: Vec<SessionSample>,
    pub drowsiness_alerts: Vec<String>,
    pub prompt: String,
}

impl SummaryRequest {
    pub fn new(samples: &[SessionSample], alert_timestamps: &[String]) -> Self {
        Self {
            emotion_data: samples.to_vec(),
            drowsiness_alerts: alert_timestamps.to_vec(),
            prompt: render_prompt(samples, alert_timestamps),
        }
    }
}

fn render_prompt(samples: &[SessionSample], alert_timestamps: &[String]) -> String {
    let mut prompt = String::from(
        "Summarize the driver's emotional state and drowsiness alerts for this drive. \
         Describe which emotions were detected and how often each occurred, \
         and state how many drowsiness alerts were triggered.\n\nEmotion data:\n",
    );

    // Writing into a String cannot fail.
    if samples.is_empty() {
        let _ = writeln!(prompt, "- {}", NO_SAMPLES_LINE);
    } else {
        for sample in samples {
            let _ = writeln!(
                prompt,
                "- {}: {} (confidence {:.2})",
                sample.timestamp, sample.emotion, sample.confidence
            );
        }
    }

    prompt.push_str("\nDrowsiness alerts:\n");
    if alert_timestamps.is_empty() {
        let _ = writeln!(prompt, "- {}", NO_ALERTS_LINE);
    } else {
        let _ = writeln!(prompt, "- {} alert(s) triggered at:", alert_timestamps.len());
        for timestamp in alert_timestamps {
            let _ = writeln!(prompt, "  - {}", timestamp);
        }
    }

    prompt
}

impl ClassifierClient {
    /// Natural-language summary of a finished drive
    pub async fn summarize_session(
        &self,
        samples: &[SessionSample],
        alert_timestamps: &[String],
    ) -> Result<String, ClassifierError> {
        if let Some(bad) = samples
            .iter()
            .find(|s| !(0.0..=1.0).contains(&s.confidence))
        {
            return Err(ClassifierError::InvalidInput(format!(
                "confidence {} outside [0, 1] at {}",
                bad.confidence, bad.timestamp
            )));
        }

        info!(
            samples = samples.len(),
            alerts = alert_timestamps.len(),
            "Requesting drive summary"
        );

        let request = SummaryRequest::new(samples, alert_timestamps);
        let response: SummaryResponse = self.call(Flow::Summary, &request).await?;

        let summary = response.summary.trim();
        if summary.is_empty() {
            return Err(ClassifierError::EmptyResult(Flow::Summary.name().to_string()));
        }
        Ok(summary.to_string())
    }
}
