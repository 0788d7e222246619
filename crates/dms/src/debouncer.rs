//! Drowsiness debouncer
//!
//! Turns a stream of per-frame verdicts into at most one alert per drowsy
//! run. Every request is stamped with a [`VerdictTicket`]; acknowledgement
//! and stop start a new epoch, so verdicts issued before them are dropped
//! when they arrive.

use crate::config::{AlertClearPolicy, DmsConfig};
use crate::state::{DrowsinessPhase, DrowsinessState};
use classifier::ClassificationVerdict;
use serde::Serialize;
use tracing::{debug, info};

/// Epoch a classification request was issued in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerdictTicket(pub(crate) u64);

/// Why an alert was cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    Acknowledged,
    AutoCleared,
    SessionStopped,
}

/// Debouncer output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceEvent {
    /// Entered `Alerting`. Emitted once per transition; the audible cue follows it.
    AlertRaised {
        message: String,
        audio_data_uri: Option<String>,
    },
    /// Left `Alerting`
    AlertCleared { reason: ClearReason },
}

/// Debounced drowsiness state machine
#[derive(Debug)]
pub struct DrowsinessDebouncer {
    config: DmsConfig,
    state: DrowsinessState,
    epoch: u64,
}

impl DrowsinessDebouncer {
    pub fn new(config: DmsConfig) -> Self {
        Self {
            config,
            state: DrowsinessState::default(),
            epoch: 0,
        }
    }

    pub fn state(&self) -> &DrowsinessState {
        &self.state
    }

    pub fn phase(&self) -> DrowsinessPhase {
        self.state.phase()
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Stamp a request about to be issued
    pub fn issue(&self) -> VerdictTicket {
        VerdictTicket(self.epoch)
    }

    pub fn is_current(&self, ticket: VerdictTicket) -> bool {
        ticket.0 == self.epoch
    }

    /// One more drowsy verdict would raise the alert
    pub fn drowsy_would_raise(&self) -> bool {
        !self.state.alert_active
            && self.state.consecutive_drowsy_count.saturating_add(1) >= self.config.effective_threshold()
    }

    /// Apply a verdict issued under `ticket`; stale verdicts change nothing
    pub fn observe_issued(
        &mut self,
        ticket: VerdictTicket,
        verdict: &ClassificationVerdict,
    ) -> Option<DebounceEvent> {
        if !self.is_current(ticket) {
            debug!(ticket = ticket.0, epoch = self.epoch, "Dropping stale drowsiness verdict");
            return None;
        }
        self.observe(verdict)
    }

    /// Apply a verdict from the current epoch
    pub fn observe(&mut self, verdict: &ClassificationVerdict) -> Option<DebounceEvent> {
        if !verdict.is_drowsy {
            self.state.consecutive_drowsy_count = 0;
            if self.state.alert_active && self.config.clear_policy == AlertClearPolicy::AutoClear {
                info!("Driver alert again, clearing drowsiness alert");
                self.state.reset();
                return Some(DebounceEvent::AlertCleared {
                    reason: ClearReason::AutoCleared,
                });
            }
            return None;
        }

        self.state.consecutive_drowsy_count = self.state.consecutive_drowsy_count.saturating_add(1);
        debug!(count = self.state.consecutive_drowsy_count, "Drowsy verdict");

        if self.state.alert_active
            || self.state.consecutive_drowsy_count < self.config.effective_threshold()
        {
            return None;
        }

        let message = verdict
            .alert_message
            .clone()
            .unwrap_or_else(|| self.config.default_alert_message.clone());
        self.state.alert_active = true;
        self.state.alert_message = message.clone();
        info!(count = self.state.consecutive_drowsy_count, "Drowsiness alert raised: {}", message);

        Some(DebounceEvent::AlertRaised {
            message,
            audio_data_uri: verdict.audio_data_uri.clone(),
        })
    }

    /// Driver acknowledged the alert. No-op unless alerting.
    pub fn acknowledge(&mut self) -> Option<DebounceEvent> {
        if !self.state.alert_active {
            return None;
        }
        info!("Drowsiness alert acknowledged");
        self.epoch += 1;
        self.state.reset();
        Some(DebounceEvent::AlertCleared {
            reason: ClearReason::Acknowledged,
        })
    }

    /// Session stopped: back to `Watching` and invalidate outstanding requests
    pub fn stop(&mut self) -> Option<DebounceEvent> {
        self.epoch += 1;
        let was_active = self.state.alert_active;
        self.state.reset();
        was_active.then_some(DebounceEvent::AlertCleared {
            reason: ClearReason::SessionStopped,
        })
    }
}

impl Default for DrowsinessDebouncer {
    fn default() -> Self {
        Self::new(DmsConfig::default())
    }
}
