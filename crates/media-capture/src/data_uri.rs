//! `data:` URI encoding for media payloads
//!
//! Every media payload exchanged with the inference backend (camera stills,
//! synthesized speech) travels as `data:<mimetype>;base64,<encoded_data>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Malformed data URI
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataUriError {
    #[error("missing 'data:' prefix")]
    MissingScheme,

    #[error("missing ',' separator between header and payload")]
    MissingSeparator,

    #[error("payload is not base64 encoded")]
    NotBase64,

    #[error("empty MIME type")]
    EmptyMimeType,

    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// Decoded data URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// MIME type, e.g. `image/jpeg` or `audio/wav`
    pub mime_type: String,
    /// Raw decoded bytes
    pub data: Vec<u8>,
}

impl DataUri {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` string
    pub fn parse(input: &str) -> Result<Self, DataUriError> {
        let rest = input
            .trim()
            .strip_prefix(SCHEME)
            .ok_or(DataUriError::MissingScheme)?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or(DataUriError::MissingSeparator)?;

        // Parameters such as `;charset=` may sit between the type and `;base64`.
        let mime_type = header
            .strip_suffix(BASE64_MARKER)
            .ok_or(DataUriError::NotBase64)?;
        let mime_type = mime_type.split(';').next().unwrap_or_default().trim();
        if mime_type.is_empty() {
            return Err(DataUriError::EmptyMimeType);
        }

        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| DataUriError::InvalidPayload(e.to_string()))?;

        Ok(Self {
            mime_type: mime_type.to_ascii_lowercase(),
            data,
        })
    }

    /// Top-level media type (`image`, `audio`, ...)
    pub fn media_type(&self) -> &str {
        self.mime_type.split('/').next().unwrap_or_default()
    }

    pub fn is_image(&self) -> bool {
        self.media_type() == "image"
    }

    pub fn is_audio(&self) -> bool {
        self.media_type() == "audio"
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{},{}",
            SCHEME,
            self.mime_type,
            BASE64_MARKER,
            STANDARD.encode(&self.data)
        )
    }
}

impl FromStr for DataUri {
    type Err = DataUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
