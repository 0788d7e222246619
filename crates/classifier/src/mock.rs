//! Scripted backend for development and tests

use crate::backend::{Flow, InferenceBackend};
use crate::ClassifierError;
use async_trait::async_trait;
use media_capture::DataUri;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

type Scripted = Result<Value, ClassifierError>;

#[derive(Default)]
struct Script {
    queued: VecDeque<Scripted>,
    fallback: Option<Scripted>,
    delay: Duration,
    requests: Vec<Value>,
}

/// Backend answering from per-flow scripts. One-shot responses are consumed
/// in order; once exhausted the flow's standing response (if any) repeats.
#[derive(Default)]
pub struct MockBackend {
    scripts: Mutex<HashMap<Flow, Script>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn scripts(&self) -> MutexGuard<'_, HashMap<Flow, Script>> {
        self.scripts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue one successful output
    pub fn respond(&self, flow: Flow, output: Value) {
        self.scripts().entry(flow).or_default().queued.push_back(Ok(output));
    }

    /// Queue one failure
    pub fn fail(&self, flow: Flow, error: ClassifierError) {
        self.scripts().entry(flow).or_default().queued.push_back(Err(error));
    }

    /// Answer every call without a queued response with `output`
    pub fn respond_always(&self, flow: Flow, output: Value) {
        self.scripts().entry(flow).or_default().fallback = Some(Ok(output));
    }

    /// Delay every answer for `flow`
    pub fn set_delay(&self, flow: Flow, delay: Duration) {
        self.scripts().entry(flow).or_default().delay = delay;
    }

    /// Number of calls made to `flow`
    pub fn calls(&self, flow: Flow) -> usize {
        self.scripts().get(&flow).map_or(0, |s| s.requests.len())
    }

    /// Inputs received by `flow`, oldest first
    pub fn requests(&self, flow: Flow) -> Vec<Value> {
        self.scripts()
            .get(&flow)
            .map(|s| s.requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    async fn invoke(&self, flow: Flow, input: Value) -> Result<Value, ClassifierError> {
        let (answer, delay) = {
            let mut scripts = self.scripts();
            let script = scripts.entry(flow).or_default();
            script.requests.push(input);
            let answer = script
                .queued
                .pop_front()
                .or_else(|| script.fallback.clone())
                .unwrap_or_else(|| Err(ClassifierError::EmptyResult(format!("{} (unscripted)", flow))));
            (answer, script.delay)
        };

        debug!(flow = %flow, delay_ms = delay.as_millis() as u64, "Mock backend answering");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        answer
    }
}

/// Mono 16-bit WAV buffer holding `pcm_len` bytes of silence
pub fn silent_wav(sample_rate: u32, pcm_len: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(44 + pcm_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + pcm_len).to_le_bytes());
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
    out.extend_from_slice(&pcm_len.to_le_bytes());
    out.resize(44 + pcm_len as usize, 0);
    out
}

/// Speech flow output of the given length
pub fn speech_data_uri(duration: Duration) -> String {
    let pcm_len = (crate::audio::SPEECH_SAMPLE_RATE as u64 * 2 * duration.as_millis() as u64 / 1000) as u32;
    DataUri::new("audio/wav", silent_wav(crate::audio::SPEECH_SAMPLE_RATE, pcm_len)).to_string()
}
