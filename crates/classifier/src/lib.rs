//! Inference Backend Client
//!
//! Talks to the hosted generative-AI flows that classify camera stills,
//! generate short messages, synthesize speech and summarize drives.

mod audio;
mod backend;
mod client;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod summary;
mod verdict;
pub mod wire;

pub use audio::{AudioClip, WavInfo};
pub use backend::{BackendConfig, Flow, HttpBackend, InferenceBackend};
pub use client::ClassifierClient;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockBackend;
pub use summary::{timestamp_now, SessionSample, SummaryRequest, NO_ALERTS_LINE, NO_SAMPLES_LINE};
pub use verdict::ClassificationVerdict;

use media_capture::DataUriError;
use thiserror::Error;

/// Errors from backend exchanges
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    /// Network or backend failure
    #[error("Classification failed: {0}")]
    Classification(String),
    /// Backend answered without a usable payload
    #[error("Empty result from {0}")]
    EmptyResult(String),
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("Malformed data URI: {0}")]
    Format(#[from] DataUriError),
    #[error("Backend timeout after {0}ms")]
    Timeout(u64),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
