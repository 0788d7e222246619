//! Flow input/output payloads

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrowsinessRequest {
    /// Camera still as a data URI
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrowsinessResponse {
    pub is_drowsy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionRequest {
    /// Camera still as a data URI
    pub media: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionResponse {
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JokeRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JokeResponse {
    #[serde(default)]
    pub joke: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResponse {
    #[serde(default)]
    pub audio_data_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    #[serde(default)]
    pub summary: String,
}
