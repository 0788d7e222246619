//! Inference backend transport
//!
//! Flows are served Genkit-style: `POST {base_url}/{flow}` with the input
//! wrapped as `{"data": ...}`, answered with `{"result": ...}`.

use crate::ClassifierError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Backend flows used by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Drowsiness,
    Emotion,
    Joke,
    Speech,
    Summary,
}

impl Flow {
    /// Flow name as served by the backend
    pub fn name(&self) -> &'static str {
        match self {
            Flow::Drowsiness => "alertOnDrowsinessFlow",
            Flow::Emotion => "analyzeUploadedMediaFlow",
            Flow::Joke => "generateJokeFlow",
            Flow::Speech => "textToSpeechFlow",
            Flow::Summary => "summarizeEmotionsAfterDriveFlow",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque remote classifier
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// One request/response exchange. `input` is the flow input, the return value its output.
    async fn invoke(&self, flow: Flow, input: Value) -> Result<Value, ClassifierError>;
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Flow server base URL
    pub base_url: String,
    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,
    /// Bearer token, if the flow server requires one
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3400".to_string(),
            timeout_ms: 15_000,
            api_key: None,
        }
    }
}

/// Wrap a flow input in the request envelope
pub fn wrap_input(input: Value) -> Value {
    json!({ "data": input })
}

/// Extract the flow output from a response envelope
pub fn unwrap_result(flow: Flow, body: Value) -> Result<Value, ClassifierError> {
    match body {
        Value::Object(mut map) => match map.remove("result") {
            Some(Value::Null) | None => Err(ClassifierError::EmptyResult(flow.name().to_string())),
            Some(result) => Ok(result),
        },
        _ => Err(ClassifierError::EmptyResult(flow.name().to_string())),
    }
}

/// HTTP flow server client
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClassifierError::Classification(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn flow_url(&self, flow: Flow) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), flow.name())
    }
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    async fn invoke(&self, flow: Flow, input: Value) -> Result<Value, ClassifierError> {
        let url = self.flow_url(flow);
        debug!(flow = %flow, "Invoking backend flow");

        let mut request = self.client.post(&url).json(&wrap_input(input));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout(self.config.timeout_ms)
            } else {
                ClassifierError::Classification(format!("{} request failed: {}", flow, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let truncated: String = error_body.chars().take(200).collect();
            warn!(flow = %flow, %status, "Backend flow returned an error");
            return Err(ClassifierError::Classification(format!(
                "{} returned {}: {}",
                flow, status, truncated
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClassifierError::EmptyResult(format!("{}: {}", flow, e)))?;

        unwrap_result(flow, body)
    }
}
