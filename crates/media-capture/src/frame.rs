//! Still frames

use crate::{CameraError, DataUri};

/// Encoded still image, created per sampling tick and discarded after classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Encoded image bytes
    pub data: Vec<u8>,
    /// MIME type of `data`
    pub mime_type: String,
    /// Sequence number assigned by the source
    pub sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, sequence: u64) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            sequence,
        }
    }

    /// Build a frame from a dashboard-supplied data URI. Only image payloads are accepted.
    pub fn from_data_uri(uri: &str, sequence: u64) -> Result<Self, CameraError> {
        let parsed = DataUri::parse(uri)?;
        if !parsed.is_image() {
            return Err(CameraError::Format(format!(
                "expected an image payload, got {}",
                parsed.mime_type
            )));
        }
        if parsed.data.is_empty() {
            return Err(CameraError::Format("empty image payload".into()));
        }
        Ok(Self {
            data: parsed.data,
            mime_type: parsed.mime_type,
            sequence,
        })
    }

    /// Wire form sent to the inference backend
    pub fn to_data_uri(&self) -> String {
        DataUri::new(self.mime_type.clone(), self.data.clone()).to_string()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
