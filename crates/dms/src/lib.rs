//! Driver Monitoring System (DMS)
//!
//! Turns backend verdicts into driver state:
//! - Drowsiness debouncing (consecutive positive frames before an alert)
//! - Mood tracking from free-text emotion analysis
//! - Mitigation guard (one cheer-up at a time)

pub mod analysis;
pub mod config;
pub mod debouncer;
pub mod emotion;
pub mod mood;
pub mod state;

pub use analysis::DriverStatus;
pub use config::{AlertClearPolicy, DmsConfig};
pub use debouncer::{ClearReason, DebounceEvent, DrowsinessDebouncer, VerdictTicket};
pub use emotion::Emotion;
pub use mood::{MoodTracker, MoodUpdate, SkipReason};
pub use state::{DrowsinessPhase, DrowsinessState, MitigationState, MoodState};

use classifier::ClassificationVerdict;

/// Driver monitoring module: debouncer and mood tracker advanced together
#[derive(Debug)]
pub struct DmsModule {
    debouncer: DrowsinessDebouncer,
    mood: MoodTracker,
}

impl DmsModule {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig) -> Self {
        Self {
            debouncer: DrowsinessDebouncer::new(config),
            mood: MoodTracker::new(),
        }
    }

    pub fn debouncer(&self) -> &DrowsinessDebouncer {
        &self.debouncer
    }

    pub fn mood(&self) -> &MoodTracker {
        &self.mood
    }

    pub fn issue_drowsiness(&self) -> VerdictTicket {
        self.debouncer.issue()
    }

    pub fn issue_emotion(&self) -> VerdictTicket {
        self.mood.issue()
    }

    pub fn on_drowsiness(&mut self, ticket: VerdictTicket, verdict: &ClassificationVerdict) -> Option<DebounceEvent> {
        self.debouncer.observe_issued(ticket, verdict)
    }

    /// Drowsiness takes priority: the mood only moves while the debouncer is watching
    pub fn on_emotion(&mut self, ticket: VerdictTicket, verdict: &ClassificationVerdict) -> MoodUpdate {
        let phase = self.debouncer.phase();
        self.mood.on_verdict_issued(ticket, verdict, phase)
    }

    pub fn acknowledge(&mut self) -> Option<DebounceEvent> {
        self.debouncer.acknowledge()
    }

    pub fn request_mitigation(&mut self) -> bool {
        self.mood.request_mitigation()
    }

    pub fn mitigation_finished(&mut self) {
        self.mood.mitigation_finished();
    }

    /// Reset driver state on session stop
    pub fn stop(&mut self) -> Option<DebounceEvent> {
        self.mood.stop();
        self.debouncer.stop()
    }

    pub fn status(&self) -> DriverStatus {
        let drowsiness = self.debouncer.state();
        let mood = self.mood.state();
        DriverStatus {
            phase: drowsiness.phase(),
            consecutive_drowsy_count: drowsiness.consecutive_drowsy_count,
            alert_active: drowsiness.alert_active,
            alert_message: drowsiness
                .alert_active
                .then(|| drowsiness.alert_message.clone()),
            emotion: mood.current_emotion,
            last_analysis: self.mood.last_analysis().map(str::to_string),
            mitigation: mood.mitigation,
        }
    }
}

impl Default for DmsModule {
    fn default() -> Self {
        Self::new(DmsConfig::default())
    }
}
