//! Alerting System
//!
//! Provides user-facing notices (permission warning, toasts, drowsiness
//! alert), toast deduplication, and the audible drowsiness cue.

mod cue;
mod manager;

pub use cue::{AudibleCue, ToneSpec, TracingCue, CUE_SAMPLE_RATE};
pub use manager::{AlertConfig, AlertManager, Notice, NoticeKind, Severity};
