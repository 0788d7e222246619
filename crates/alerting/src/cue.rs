//! Audible drowsiness cue

use serde::Serialize;
use tracing::info;

/// Rate the buzzer is rendered at for the dashboard
pub const CUE_SAMPLE_RATE: u32 = 24_000;

/// Square-wave buzzer tone with an exponential fade to silence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneSpec {
    pub frequency_hz: f32,
    pub duration_ms: u32,
}

impl ToneSpec {
    /// The drowsiness buzzer (A6, half a second)
    pub const BUZZER: ToneSpec = ToneSpec {
        frequency_hz: 880.0,
        duration_ms: 500,
    };

    /// Gain reached at the end of the fade
    const FLOOR_GAIN: f32 = 0.0001;

    /// Render as mono 16-bit PCM
    pub fn render_pcm(&self, sample_rate: u32) -> Vec<i16> {
        let len = (sample_rate as u64 * self.duration_ms as u64 / 1000) as usize;
        if len == 0 {
            return Vec::new();
        }
        let decay = -Self::FLOOR_GAIN.ln() / len as f32;
        let period = sample_rate as f32 / self.frequency_hz;

        (0..len)
            .map(|i| {
                let phase = (i as f32 % period) / period;
                let value = if phase < 0.5 { 1.0 } else { -1.0 };
                let gain = (-decay * i as f32).exp();
                (value * gain * i16::MAX as f32) as i16
            })
            .collect()
    }

    /// Render as a mono 16-bit PCM WAV file
    pub fn to_wav(&self, sample_rate: u32) -> Vec<u8> {
        let pcm = self.render_pcm(sample_rate);
        let data_size = (pcm.len() * 2) as u32;

        let mut out = Vec::with_capacity(44 + pcm.len() * 2);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_size).to_le_bytes());
        out.extend_from_slice(b"WAVE");

        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());

        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_size.to_le_bytes());
        for sample in pcm {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }
}

/// Output seam for the drowsiness buzzer
pub trait AudibleCue: Send + Sync {
    fn sound(&self, tone: ToneSpec);
}

/// Cue that only logs; the dashboard fetches the rendered tone and plays it
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCue;

impl AudibleCue for TracingCue {
    fn sound(&self, tone: ToneSpec) {
        info!(
            frequency_hz = tone.frequency_hz,
            duration_ms = tone.duration_ms,
            "Sounding drowsiness buzzer"
        );
    }
}
