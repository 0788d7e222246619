//! Live camera source
//!
//! The dashboard owns the physical camera. It reports the permission outcome
//! and pushes encoded stills; the samplers read the most recent one.

use crate::{CameraError, Frame};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Stills older than this are not sampled
pub const DEFAULT_MAX_FRAME_AGE: Duration = Duration::from_secs(5);

/// Read side of a video source, shared by every sampler
pub trait FrameSource: Send + Sync {
    /// Whether the source is live, unpaused and holds a fresh still
    fn is_active(&self) -> bool;

    /// Produce one still, or `None` when the source is not active
    fn capture(&self) -> Option<Frame>;
}

/// Capture handle lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// No permission decision reported yet
    AwaitingPermission,
    /// Camera/microphone access denied
    Denied,
    /// Streaming
    Active,
    /// Stream open but video paused
    Paused,
    /// Handle released on session stop
    Released,
}

struct Inner {
    state: CaptureState,
    latest: Option<(Frame, Instant)>,
}

/// Camera source fed by the dashboard
pub struct LiveSource {
    inner: Mutex<Inner>,
    sequence: AtomicU64,
    max_age: Duration,
}

impl LiveSource {
    pub fn new() -> Self {
        Self::with_max_age(DEFAULT_MAX_FRAME_AGE)
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CaptureState::AwaitingPermission,
                latest: None,
            }),
            sequence: AtomicU64::new(0),
            max_age,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> CaptureState {
        self.lock().state
    }

    /// Record the dashboard's permission outcome
    pub fn set_permission(&self, granted: bool) {
        let mut inner = self.lock();
        inner.state = if granted {
            info!("Camera access granted");
            CaptureState::Active
        } else {
            warn!("Camera access denied");
            inner.latest = None;
            CaptureState::Denied
        };
    }

    /// Open the handle for a new session
    pub fn acquire(&self) -> Result<(), CameraError> {
        let mut inner = self.lock();
        match inner.state {
            CaptureState::AwaitingPermission | CaptureState::Denied => {
                Err(CameraError::PermissionDenied)
            }
            CaptureState::Released | CaptureState::Paused => {
                debug!("Capture handle reopened");
                inner.state = CaptureState::Active;
                Ok(())
            }
            CaptureState::Active => Ok(()),
        }
    }

    /// Store a new still pushed by the dashboard
    pub fn push(&self, mut frame: Frame) -> Result<u64, CameraError> {
        let mut inner = self.lock();
        match inner.state {
            CaptureState::AwaitingPermission | CaptureState::Denied => {
                return Err(CameraError::PermissionDenied)
            }
            CaptureState::Released => return Err(CameraError::Released),
            CaptureState::Active | CaptureState::Paused => {}
        }
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        frame.sequence = sequence;
        inner.latest = Some((frame, Instant::now()));
        Ok(sequence)
    }

    /// Parse and store a dashboard still given as a data URI
    pub fn push_data_uri(&self, uri: &str) -> Result<u64, CameraError> {
        let frame = Frame::from_data_uri(uri, 0)?;
        self.push(frame)
    }

    pub fn pause(&self) {
        let mut inner = self.lock();
        if inner.state == CaptureState::Active {
            inner.state = CaptureState::Paused;
        }
    }

    pub fn resume(&self) {
        let mut inner = self.lock();
        if inner.state == CaptureState::Paused {
            inner.state = CaptureState::Active;
        }
    }

    /// Release the capture handle. Returns `true` only for the call that released it.
    pub fn release(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CaptureState::Active | CaptureState::Paused => {
                inner.state = CaptureState::Released;
                inner.latest = None;
                info!("Capture handle released");
                true
            }
            _ => false,
        }
    }
}

impl Default for LiveSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for LiveSource {
    fn is_active(&self) -> bool {
        let inner = self.lock();
        inner.state == CaptureState::Active
            && inner
                .latest
                .as_ref()
                .is_some_and(|(_, at)| at.elapsed() <= self.max_age)
    }

    fn capture(&self) -> Option<Frame> {
        let inner = self.lock();
        if inner.state != CaptureState::Active {
            return None;
        }
        inner
            .latest
            .as_ref()
            .filter(|(_, at)| at.elapsed() <= self.max_age)
            .map(|(frame, _)| frame.clone())
    }
}
