//! State shared between the session handle, the sampler consumers and
//! mitigation tasks

use alerting::{AlertManager, AudibleCue, Severity, ToneSpec};
use classifier::{timestamp_now, ClassificationVerdict, ClassifierClient, ClassifierError, SessionSample};
use dms::{DebounceEvent, DmsModule, MoodUpdate, VerdictTicket};
use metrics::counter;
use mitigation::MitigationDispatcher;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Confidence recorded for an emotion found in the analysis
const MATCHED_CONFIDENCE: f32 = 1.0;
/// Confidence recorded for the neutral fallback
const FALLBACK_CONFIDENCE: f32 = 0.5;

pub(crate) struct Core {
    pub dms: DmsModule,
    pub alerts: AlertManager,
    pub samples: Vec<SessionSample>,
    pub alert_timestamps: Vec<String>,
    pub last_joke: Option<String>,
    /// Bumped on every stop; mitigation results from older runs are dropped
    pub generation: u64,
    /// Cancelled and replaced on every stop
    run_token: CancellationToken,
}

impl Core {
    pub fn new(dms: DmsModule, alerts: AlertManager) -> Self {
        Self {
            dms,
            alerts,
            samples: Vec::new(),
            alert_timestamps: Vec::new(),
            last_joke: None,
            generation: 0,
            run_token: CancellationToken::new(),
        }
    }

    /// Cancel tasks spawned before this call and move to the next generation
    pub fn end_run(&mut self) {
        self.generation += 1;
        let previous = std::mem::replace(&mut self.run_token, CancellationToken::new());
        previous.cancel();
    }
}

pub(crate) struct Shared {
    core: Mutex<Core>,
    pub client: ClassifierClient,
    dispatcher: MitigationDispatcher,
    cue: Arc<dyn AudibleCue>,
    pub speak_alerts: bool,
}

impl Shared {
    pub fn new(
        core: Core,
        client: ClassifierClient,
        dispatcher: MitigationDispatcher,
        cue: Arc<dyn AudibleCue>,
        speak_alerts: bool,
    ) -> Self {
        Self {
            core: Mutex::new(core),
            client,
            dispatcher,
            cue,
            speak_alerts,
        }
    }

    pub fn core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn apply_drowsiness(&self, ticket: VerdictTicket, verdict: &ClassificationVerdict) {
        let raised = {
            let mut core = self.core();
            match core.dms.on_drowsiness(ticket, verdict) {
                Some(DebounceEvent::AlertRaised {
                    message,
                    audio_data_uri,
                }) => {
                    core.alerts.raise_drowsiness(&message, audio_data_uri);
                    core.alert_timestamps.push(timestamp_now());
                    true
                }
                Some(DebounceEvent::AlertCleared { reason }) => {
                    debug!(?reason, "Drowsiness alert cleared");
                    core.alerts.clear_drowsiness();
                    false
                }
                None => false,
            }
        };

        if raised {
            counter!("drive_monitor_alerts_raised_total").increment(1);
            self.cue.sound(ToneSpec::BUZZER);
        }
    }

    pub fn apply_emotion(self: &Arc<Self>, ticket: VerdictTicket, verdict: &ClassificationVerdict) {
        let dispatch = {
            let mut core = self.core();
            match core.dms.on_emotion(ticket, verdict) {
                MoodUpdate::Updated {
                    emotion,
                    matched,
                    mitigate,
                } => {
                    let confidence = if matched {
                        MATCHED_CONFIDENCE
                    } else {
                        FALLBACK_CONFIDENCE
                    };
                    core.samples
                        .push(SessionSample::now(emotion.display_name(), confidence));
                    mitigate.then(|| (core.generation, core.run_token.clone()))
                }
                MoodUpdate::Skipped(reason) => {
                    debug!(reason = reason.as_str(), "Emotion verdict skipped");
                    counter!("drive_monitor_emotion_skipped_total", "reason" => reason.as_str())
                        .increment(1);
                    None
                }
            }
        };

        if let Some((generation, token)) = dispatch {
            self.dispatch_mitigation(generation, token);
        }
    }

    /// Show a failure toast unless the request was issued before a stop or acknowledgement
    pub fn report_failure(&self, title: &str, still_current: impl FnOnce(&Core) -> bool, err: &ClassifierError) {
        let mut core = self.core();
        if still_current(&core) {
            core.alerts.toast(Severity::Warning, title, &err.to_string());
        }
    }

    /// Manual cheer-up. Returns `false` when one is already running.
    pub fn request_mitigation(self: &Arc<Self>) -> bool {
        let (generation, token) = {
            let mut core = self.core();
            if !core.dms.request_mitigation() {
                return false;
            }
            (core.generation, core.run_token.clone())
        };
        self.dispatch_mitigation(generation, token);
        true
    }

    /// Run the dispatcher in the background. The guard is already `InFlight`.
    fn dispatch_mitigation(self: &Arc<Self>, generation: u64, token: CancellationToken) {
        let shared = Arc::clone(self);
        info!("Dispatching mitigation");

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    debug!("Mitigation cancelled");
                    let mut core = shared.core();
                    if core.generation == generation {
                        core.dms.mitigation_finished();
                    }
                    return;
                }
                outcome = shared.dispatcher.run() => outcome,
            };

            let mut core = shared.core();
            if core.generation != generation {
                debug!("Dropping mitigation result from a stopped run");
                return;
            }
            match outcome {
                Ok(outcome) => {
                    counter!("drive_monitor_mitigations_total", "outcome" => "played").increment(1);
                    core.last_joke = Some(outcome.joke);
                }
                Err(e) => {
                    counter!("drive_monitor_mitigations_total", "outcome" => "aborted").increment(1);
                    warn!("Mitigation aborted: {}", e);
                }
            }
            core.dms.mitigation_finished();
        });
    }
}
