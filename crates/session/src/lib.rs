//! Monitoring Session
//!
//! Owns the capture handle and both samplers, and routes verdicts to the
//! driver state, the notices and the mitigation dispatcher.

mod config;
mod consumer;
mod session;
mod shared;

pub use config::SessionConfig;
pub use session::{MonitoringSession, SessionBuilder, SessionStatus};

use classifier::ClassifierError;
use media_capture::CameraError;
use thiserror::Error;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("Session already running")]
    AlreadyRunning,
}
