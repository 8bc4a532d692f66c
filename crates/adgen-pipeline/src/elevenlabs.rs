//! ElevenLabs speech synthesis client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::adapters::SpeechSynthesizer;
use crate::error::{PipelineError, PipelineResult};

const API_BASE: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";
const DEFAULT_TTS_MODEL: &str = "eleven_multilingual_v2";

/// ElevenLabs API client.
pub struct ElevenLabsClient {
    api_key: String,
    client: Client,
}

impl ElevenLabsClient {
    /// Create a new client.
    pub fn new() -> PipelineResult<Self> {
        let api_key = std::env::var("ELEVENLABS_API_KEY")
            .map_err(|_| PipelineError::validation("ELEVENLABS_API_KEY not set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PipelineError::transient(e.to_string()))?;

        Ok(Self { api_key, client })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice_id: Option<&str>) -> PipelineResult<Vec<u8>> {
        let voice = voice_id.unwrap_or(DEFAULT_VOICE_ID);
        let url = format!("{}/text-to-speech/{}", API_BASE, voice);

        let body = json!({
            "text": text,
            "model_id": DEFAULT_TTS_MODEL,
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::transient(format!("Speech request failed: {}", e)))?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return if PipelineError::status_is_transient(status) {
                Err(PipelineError::transient(format!(
                    "Speech model returned {}: {}",
                    status, text
                )))
            } else {
                Err(PipelineError::validation(format!(
                    "Speech model rejected the request ({}): {}",
                    status, text
                )))
            };
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::transient(format!("Speech download failed: {}", e)))?
            .to_vec();

        info!("Synthesized {} bytes of audio with voice {}", bytes.len(), voice);
        Ok(bytes)
    }
}
