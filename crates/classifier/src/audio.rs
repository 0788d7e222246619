//! Synthesized speech clips
//!
//! The speech flow answers with a base64 WAV data URI (mono, 24 kHz, 16-bit
//! PCM). Only the RIFF header is inspected; samples are passed through.

use crate::ClassifierError;
use media_capture::DataUri;
use std::time::Duration;

/// Format of the speech flow's output
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;

/// Parsed WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Length of the `data` chunk in bytes
    pub data_len: u32,
}

impl WavInfo {
    /// Read the `fmt ` and `data` chunks of a RIFF/WAVE buffer
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return None;
        }

        let mut fmt: Option<(u16, u32, u16)> = None;
        let mut offset = 12;
        while offset + 8 <= bytes.len() {
            let id = &bytes[offset..offset + 4];
            let size = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().ok()?);
            let body = offset + 8;

            match id {
                b"fmt " => {
                    let chunk = bytes.get(body..body + 16)?;
                    let channels = u16::from_le_bytes([chunk[2], chunk[3]]);
                    let sample_rate = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
                    let bits = u16::from_le_bytes([chunk[14], chunk[15]]);
                    fmt = Some((channels, sample_rate, bits));
                }
                b"data" => {
                    let (channels, sample_rate, bits_per_sample) = fmt?;
                    // Streamed WAVs may carry a placeholder size; clamp to what is present.
                    let available = bytes.len().saturating_sub(body) as u32;
                    return Some(Self {
                        channels,
                        sample_rate,
                        bits_per_sample,
                        data_len: size.min(available),
                    });
                }
                _ => {}
            }

            // Chunks are word aligned
            offset = body + size as usize + (size as usize & 1);
        }
        None
    }

    pub fn duration(&self) -> Duration {
        let bytes_per_second =
            self.sample_rate as u64 * self.channels as u64 * (self.bits_per_sample as u64 / 8);
        if bytes_per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.data_len as u64 * 1000 / bytes_per_second)
    }
}

/// Audio payload ready for playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    uri: DataUri,
}

impl AudioClip {
    /// Parse a speech flow data URI
    pub fn from_data_uri(input: &str) -> Result<Self, ClassifierError> {
        let uri = DataUri::parse(input)?;
        if !uri.is_audio() {
            return Err(ClassifierError::Synthesis(format!(
                "expected an audio payload, got {}",
                uri.mime_type
            )));
        }
        if uri.data.is_empty() {
            return Err(ClassifierError::Synthesis("empty audio payload".into()));
        }
        Ok(Self { uri })
    }

    pub fn mime_type(&self) -> &str {
        &self.uri.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.uri.data
    }

    pub fn wav_info(&self) -> Option<WavInfo> {
        WavInfo::parse(&self.uri.data)
    }

    /// Playback length, when the header can be read
    pub fn duration(&self) -> Option<Duration> {
        self.wav_info().map(|info| info.duration())
    }

    pub fn to_data_uri(&self) -> String {
        self.uri.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::silent_wav as wav_bytes;

    #[test]
    fn test_wav_header() {
        // One second of 24kHz mono 16-bit audio
        let bytes = wav_bytes(SPEECH_SAMPLE_RATE, 48_000);
        let info = WavInfo::parse(&bytes).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.sample_rate, SPEECH_SAMPLE_RATE);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_truncated_data_chunk_is_clamped() {
        let mut bytes = wav_bytes(SPEECH_SAMPLE_RATE, 4_800);
        bytes.truncate(44 + 2_400);
        let info = WavInfo::parse(&bytes).unwrap();
        assert_eq!(info.data_len, 2_400);
        assert_eq!(info.duration(), Duration::from_millis(50));
    }

    #[test]
    fn test_not_a_wav() {
        assert!(WavInfo::parse(b"OggS....").is_none());
        assert!(WavInfo::parse(&[]).is_none());
    }

    #[test]
    fn test_clip_requires_audio_mime() {
        let clip = AudioClip::from_data_uri("data:audio/wav;base64,UklGRg==").unwrap();
        assert_eq!(clip.mime_type(), "audio/wav");
        assert!(clip.duration().is_none());

        assert!(matches!(
            AudioClip::from_data_uri("data:image/png;base64,AA=="),
            Err(ClassifierError::Synthesis(_))
        ));
        assert!(matches!(
            AudioClip::from_data_uri("audio/wav;base64,AA=="),
            Err(ClassifierError::Format(_))
        ));
    }
}
