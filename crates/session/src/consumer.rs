//! Sampler consumers: one classification per sampled frame

use crate::shared::Shared;
use async_trait::async_trait;
use media_capture::{Frame, FrameConsumer};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) struct DrowsinessConsumer {
    pub shared: Arc<Shared>,
}

#[async_trait]
impl FrameConsumer for DrowsinessConsumer {
    async fn consume(&self, frame: Frame) {
        let (ticket, speak) = {
            let core = self.shared.core();
            let speak = self.shared.speak_alerts && core.dms.debouncer().drowsy_would_raise();
            (core.dms.issue_drowsiness(), speak)
        };

        // Speech only for the verdict that can raise the alert
        let result = if speak {
            self.shared.client.classify_drowsiness_spoken(&frame).await
        } else {
            self.shared.client.classify_drowsiness(&frame).await
        };

        match result {
            Ok(verdict) => {
                debug!(sequence = frame.sequence, drowsy = verdict.is_drowsy, "Drowsiness verdict");
                let label = if verdict.is_drowsy { "drowsy" } else { "awake" };
                counter!("drive_monitor_verdicts_total", "flow" => "drowsiness", "result" => label)
                    .increment(1);
                self.shared.apply_drowsiness(ticket, &verdict);
            }
            Err(e) => {
                warn!("Drowsiness check failed, tick skipped: {}", e);
                counter!("drive_monitor_classifier_errors_total", "flow" => "drowsiness").increment(1);
                self.shared.report_failure(
                    "Drowsiness Check Failed",
                    |core| core.dms.debouncer().is_current(ticket),
                    &e,
                );
            }
        }
    }
}

pub(crate) struct EmotionConsumer {
    pub shared: Arc<Shared>,
}

#[async_trait]
impl FrameConsumer for EmotionConsumer {
    async fn consume(&self, frame: Frame) {
        let ticket = self.shared.core().dms.issue_emotion();

        match self.shared.client.classify_emotion(&frame).await {
            Ok(verdict) => {
                debug!(sequence = frame.sequence, "Emotion verdict");
                counter!("drive_monitor_verdicts_total", "flow" => "emotion", "result" => "analysis")
                    .increment(1);
                self.shared.apply_emotion(ticket, &verdict);
            }
            Err(e) => {
                warn!("Emotion analysis failed, tick skipped: {}", e);
                counter!("drive_monitor_classifier_errors_total", "flow" => "emotion").increment(1);
                self.shared.report_failure(
                    "Emotion Analysis Failed",
                    |core| core.dms.mood().is_current(ticket),
                    &e,
                );
            }
        }
    }
}
