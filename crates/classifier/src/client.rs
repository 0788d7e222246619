//! Classifier Client Implementation

use crate::backend::{Flow, InferenceBackend};
use crate::wire::{
    DrowsinessRequest, DrowsinessResponse, EmotionRequest, EmotionResponse, JokeRequest,
    JokeResponse, SpeechRequest, SpeechResponse,
};
use crate::{AudioClip, ClassificationVerdict, ClassifierError};
use media_capture::Frame;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Typed front for the inference backend. One call, one exchange; no retries.
#[derive(Clone)]
pub struct ClassifierClient {
    backend: Arc<dyn InferenceBackend>,
}

impl ClassifierClient {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        info!("Creating classifier client");
        Self { backend }
    }

    pub(crate) async fn call<Req, Resp>(&self, flow: Flow, request: &Req) -> Result<Resp, ClassifierError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let input = serde_json::to_value(request)
            .map_err(|e| ClassifierError::InvalidInput(e.to_string()))?;

        let start = Instant::now();
        let output = self.backend.invoke(flow, input).await?;
        debug!(flow = %flow, latency_ms = start.elapsed().as_millis() as u64, "Flow completed");

        serde_json::from_value(output)
            .map_err(|e| ClassifierError::EmptyResult(format!("{}: {}", flow, e)))
    }

    /// Ask whether the driver's eyes are closed in `frame`
    pub async fn classify_drowsiness(&self, frame: &Frame) -> Result<ClassificationVerdict, ClassifierError> {
        let request = DrowsinessRequest {
            image: frame.to_data_uri(),
        };
        let response: DrowsinessResponse = self.call(Flow::Drowsiness, &request).await?;

        Ok(ClassificationVerdict {
            is_drowsy: response.is_drowsy,
            alert_message: response
                .alert_message
                .filter(|m| !m.trim().is_empty()),
            audio_data_uri: response.audio_data_uri,
            ..Default::default()
        })
    }

    /// Like [`classify_drowsiness`](Self::classify_drowsiness), but a positive verdict with
    /// an alert message also carries a spoken rendition. Synthesis failure degrades to
    /// a text-only verdict.
    pub async fn classify_drowsiness_spoken(&self, frame: &Frame) -> Result<ClassificationVerdict, ClassifierError> {
        let mut verdict = self.classify_drowsiness(frame).await?;
        if !verdict.is_drowsy || verdict.has_audio() {
            return Ok(verdict);
        }

        if let Some(message) = verdict.alert_message.clone() {
            match self.synthesize_speech(&message).await {
                Ok(clip) => verdict.audio_data_uri = Some(clip.to_data_uri()),
                Err(e) => warn!("Alert speech unavailable, continuing text-only: {}", e),
            }
        }
        Ok(verdict)
    }

    /// Ask for a free-text emotion analysis of `frame`
    pub async fn classify_emotion(&self, frame: &Frame) -> Result<ClassificationVerdict, ClassifierError> {
        let request = EmotionRequest {
            media: frame.to_data_uri(),
        };
        let response: EmotionResponse = self.call(Flow::Emotion, &request).await?;

        let summary = response.summary.trim();
        if summary.is_empty() {
            return Err(ClassifierError::EmptyResult(Flow::Emotion.name().to_string()));
        }
        Ok(ClassificationVerdict::emotion(summary))
    }

    /// Short family-friendly joke
    pub async fn generate_joke(&self) -> Result<String, ClassifierError> {
        let response: JokeResponse = self.call(Flow::Joke, &JokeRequest {}).await?;
        let joke = response.joke.trim();
        if joke.is_empty() {
            return Err(ClassifierError::EmptyResult(Flow::Joke.name().to_string()));
        }
        Ok(joke.to_string())
    }

    /// Spoken rendition of `text`
    pub async fn synthesize_speech(&self, text: &str) -> Result<AudioClip, ClassifierError> {
        let request = SpeechRequest {
            text: text.to_string(),
        };
        let response: SpeechResponse = self
            .call(Flow::Speech, &request)
            .await
            .map_err(|e| match e {
                ClassifierError::Synthesis(_) | ClassifierError::Format(_) => e,
                other => ClassifierError::Synthesis(other.to_string()),
            })?;

        if response.audio_data_uri.trim().is_empty() {
            return Err(ClassifierError::Synthesis("no audio returned".into()));
        }
        AudioClip::from_data_uri(&response.audio_data_uri)
    }
}
