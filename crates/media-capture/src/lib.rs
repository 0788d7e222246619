//! Media Capture Library for Driver Monitoring
//!
//! Provides the still-frame side of the monitoring loop:
//! - Live camera source fed by the dashboard (permission, pause, release)
//! - Frame sampling on independent periodic timers
//! - `data:<mime>;base64,<payload>` encoding for frames and audio clips

pub mod data_uri;
pub mod frame;
pub mod sampler;
pub mod source;

pub use data_uri::{DataUri, DataUriError};
pub use frame::Frame;
pub use sampler::{FrameConsumer, FrameSampler, GateState, InFlightGuard, SamplerStats, TickGate};
pub use source::{CaptureState, FrameSource, LiveSource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera or microphone access denied")]
    PermissionDenied,

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Capture handle already released")]
    Released,
}

impl From<DataUriError> for CameraError {
    fn from(err: DataUriError) -> Self {
        CameraError::Format(err.to_string())
    }
}
