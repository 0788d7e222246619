//! Emotion mood tracker

use crate::debouncer::VerdictTicket;
use crate::emotion::Emotion;
use crate::state::{DrowsinessPhase, MitigationState, MoodState};
use classifier::ClassificationVerdict;
use serde::Serialize;
use tracing::{debug, info};

/// Why a verdict did not update the mood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Drowsiness run or alert in progress
    DrowsinessPriority,
    MitigationInFlight,
    /// Issued before the last stop
    Stale,
    /// Neither a label nor any text
    NoContent,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::DrowsinessPriority => "drowsiness_priority",
            SkipReason::MitigationInFlight => "mitigation_in_flight",
            SkipReason::Stale => "stale",
            SkipReason::NoContent => "no_content",
        }
    }
}

/// Result of feeding one verdict to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodUpdate {
    Skipped(SkipReason),
    Updated {
        emotion: Emotion,
        /// A known label was found (as opposed to the neutral fallback)
        matched: bool,
        /// Caller must dispatch a mitigation and report back via
        /// [`MoodTracker::mitigation_finished`]
        mitigate: bool,
    },
}

/// Tracks the last known emotion and owns the mitigation guard
#[derive(Debug, Default)]
pub struct MoodTracker {
    state: MoodState,
    last_analysis: Option<String>,
    epoch: u64,
}

impl MoodTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MoodState {
        self.state
    }

    pub fn current_emotion(&self) -> Emotion {
        self.state.current_emotion
    }

    /// Free text of the last accepted verdict
    pub fn last_analysis(&self) -> Option<&str> {
        self.last_analysis.as_deref()
    }

    /// Stamp a request about to be issued
    pub fn issue(&self) -> VerdictTicket {
        VerdictTicket(self.epoch)
    }

    pub fn is_current(&self, ticket: VerdictTicket) -> bool {
        ticket == self.issue()
    }

    /// Apply a verdict issued under `ticket`
    pub fn on_verdict_issued(
        &mut self,
        ticket: VerdictTicket,
        verdict: &ClassificationVerdict,
        drowsiness: DrowsinessPhase,
    ) -> MoodUpdate {
        if !self.is_current(ticket) {
            debug!("Dropping stale emotion verdict");
            return MoodUpdate::Skipped(SkipReason::Stale);
        }
        self.on_verdict(verdict, drowsiness)
    }

    /// Apply a verdict from the current epoch
    pub fn on_verdict(&mut self, verdict: &ClassificationVerdict, drowsiness: DrowsinessPhase) -> MoodUpdate {
        if drowsiness != DrowsinessPhase::Watching {
            return MoodUpdate::Skipped(SkipReason::DrowsinessPriority);
        }
        if self.state.mitigation_in_flight() {
            return MoodUpdate::Skipped(SkipReason::MitigationInFlight);
        }

        let (emotion, matched) = match Self::resolve(verdict) {
            Some(resolved) => resolved,
            None => return MoodUpdate::Skipped(SkipReason::NoContent),
        };

        if emotion != self.state.current_emotion {
            info!(from = %self.state.current_emotion, to = %emotion, "Mood changed");
        }
        self.state.current_emotion = emotion;
        if let Some(text) = &verdict.summary_text {
            self.last_analysis = Some(text.clone());
        }

        let mitigate = emotion.needs_mitigation();
        if mitigate {
            info!("Sustained negative mood, dispatching mitigation");
            self.state.mitigation = MitigationState::InFlight;
        }

        MoodUpdate::Updated {
            emotion,
            matched,
            mitigate,
        }
    }

    fn resolve(verdict: &ClassificationVerdict) -> Option<(Emotion, bool)> {
        if let Some(label) = verdict.emotion_label.as_deref().filter(|l| !l.trim().is_empty()) {
            let found = label.parse().ok().or_else(|| Emotion::find_in(label));
            return Some(found.map_or((Emotion::Neutral, false), |e| (e, true)));
        }
        verdict
            .summary_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|text| {
                Emotion::find_in(text).map_or((Emotion::Neutral, false), |e| (e, true))
            })
    }

    /// Manual cheer-up request. Returns `false` when one is already running.
    pub fn request_mitigation(&mut self) -> bool {
        if self.state.mitigation_in_flight() {
            debug!("Mitigation already in flight, request ignored");
            return false;
        }
        self.state.mitigation = MitigationState::InFlight;
        true
    }

    /// The dispatched mitigation finished, successfully or not
    pub fn mitigation_finished(&mut self) {
        self.state.mitigation = MitigationState::Idle;
    }

    /// Session stopped: release the guard and invalidate outstanding requests
    pub fn stop(&mut self) {
        self.epoch += 1;
        self.state.mitigation = MitigationState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATCHING: DrowsinessPhase = DrowsinessPhase::Watching;

    #[test]
    fn test_summary_text_resolution() {
        let mut tracker = MoodTracker::new();
        let update = tracker.on_verdict(
            &ClassificationVerdict::emotion("The driver appears happy and relaxed"),
            WATCHING,
        );
        assert_eq!(
            update,
            MoodUpdate::Updated {
                emotion: Emotion::Happy,
                matched: true,
                mitigate: false
            }
        );
        assert_eq!(tracker.last_analysis(), Some("The driver appears happy and relaxed"));
    }

    #[test]
    fn test_unknown_text_falls_back_to_neutral() {
        let mut tracker = MoodTracker::new();
        tracker.on_verdict(&ClassificationVerdict::emotion("looks angry"), WATCHING);

        let update = tracker.on_verdict(&ClassificationVerdict::emotion("Eyes on the road"), WATCHING);
        assert_eq!(
            update,
            MoodUpdate::Updated {
                emotion: Emotion::Neutral,
                matched: false,
                mitigate: false
            }
        );
        assert_eq!(tracker.current_emotion(), Emotion::Neutral);
    }

    #[test]
    fn test_label_takes_precedence_over_text() {
        let mut tracker = MoodTracker::new();
        let verdict = ClassificationVerdict {
            emotion_label: Some("Stressed".into()),
            summary_text: Some("seems happy".into()),
            ..Default::default()
        };
        tracker.on_verdict(&verdict, WATCHING);
        assert_eq!(tracker.current_emotion(), Emotion::Stressed);
    }

    #[test]
    fn test_skipped_during_drowsiness() {
        let mut tracker = MoodTracker::new();
        for phase in [DrowsinessPhase::Suspect, DrowsinessPhase::Alerting] {
            assert_eq!(
                tracker.on_verdict(&ClassificationVerdict::labelled("sad"), phase),
                MoodUpdate::Skipped(SkipReason::DrowsinessPriority)
            );
        }
        assert_eq!(tracker.current_emotion(), Emotion::Neutral);
        assert!(!tracker.state().mitigation_in_flight());
    }

    #[test]
    fn test_sad_dispatches_single_mitigation() {
        let mut tracker = MoodTracker::new();
        let first = tracker.on_verdict(&ClassificationVerdict::emotion("The driver looks sad"), WATCHING);
        assert!(matches!(first, MoodUpdate::Updated { mitigate: true, .. }));
        assert!(tracker.state().mitigation_in_flight());

        // Further verdicts and manual requests are held off while in flight
        assert_eq!(
            tracker.on_verdict(&ClassificationVerdict::emotion("still sad"), WATCHING),
            MoodUpdate::Skipped(SkipReason::MitigationInFlight)
        );
        assert!(!tracker.request_mitigation());

        tracker.mitigation_finished();
        assert!(tracker.request_mitigation());
    }

    #[test]
    fn test_empty_verdict_is_skipped() {
        let mut tracker = MoodTracker::new();
        assert_eq!(
            tracker.on_verdict(&ClassificationVerdict::emotion("  "), WATCHING),
            MoodUpdate::Skipped(SkipReason::NoContent)
        );
    }

    #[test]
    fn test_stop_drops_outstanding_verdicts() {
        let mut tracker = MoodTracker::new();
        let ticket = tracker.issue();
        tracker.request_mitigation();

        tracker.stop();
        assert!(!tracker.state().mitigation_in_flight());
        assert_eq!(
            tracker.on_verdict_issued(ticket, &ClassificationVerdict::labelled("angry"), WATCHING),
            MoodUpdate::Skipped(SkipReason::Stale)
        );
        assert_eq!(tracker.current_emotion(), Emotion::Neutral);
    }
}
