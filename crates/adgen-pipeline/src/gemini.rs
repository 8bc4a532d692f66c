//! Gemini client: script planning and clip verification.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::{ClipVerifier, PlanRequest, PlannedShot, TextPlanner, VerificationOutcome};
use crate::error::{PipelineError, PipelineResult};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// One planned shot as returned by the model.
#[derive(Debug, Deserialize)]
struct ShotJson {
    segment: String,
    prompt: String,
}

/// Verification result as returned by the model.
#[derive(Debug, Deserialize)]
struct VerificationJson {
    confidence_score: f64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    feedback: String,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new() -> PipelineResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| PipelineError::validation("GEMINI_API_KEY not set"))?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PipelineError::transient(e.to_string()))?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }

    async fn generate(&self, parts: Vec<Part>) -> PipelineResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            API_BASE, self.model, self.api_key
        );

        let body = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::transient(format!("Gemini request failed: {}", e)))?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return if PipelineError::status_is_transient(status) {
                Err(PipelineError::transient(format!(
                    "Gemini returned {}: {}",
                    status, text
                )))
            } else {
                Err(PipelineError::planning(format!(
                    "Gemini returned {}: {}",
                    status, text
                )))
            };
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::planning(format!("Unparseable Gemini response: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| PipelineError::planning("Gemini response had no candidates"))
    }

    fn planning_prompt(request: &PlanRequest<'_>) -> String {
        let mut prompt = format!(
            "Split this advertisement script into shots of roughly {} seconds of \
             spoken dialogue each. For every shot return the exact dialogue text and a \
             visual prompt for a video generation model.\n\
             \n\
             Script:\n{}\n\
             \n\
             Character: {}\n\
             \n\
             Rules:\n\
             - The concatenation of all \"segment\" fields must reproduce the script \
             word for word, in order, with nothing dropped or rephrased.\n\
             - Each \"prompt\" describes camera framing, the character's action, and \
             the setting. Never include the dialogue in the prompt; it is delivered \
             to the video model separately.\n\
             - Respond with a JSON array only: \
             [{{\"segment\": \"...\", \"prompt\": \"...\"}}, ...]",
            request.target_seconds_per_clip, request.script, request.character_name,
        );

        if let Some(note) = request.corrective_note {
            prompt.push_str("\n\nCorrection: ");
            prompt.push_str(note);
        }

        prompt
    }
}

#[async_trait]
impl TextPlanner for GeminiClient {
    async fn plan(&self, request: &PlanRequest<'_>) -> PipelineResult<Vec<PlannedShot>> {
        debug!(
            "Planning script ({} chars) for character {}",
            request.script.len(),
            request.character_name
        );

        let text = self
            .generate(vec![Part::Text {
                text: Self::planning_prompt(request),
            }])
            .await?;

        let shots: Vec<ShotJson> = serde_json::from_str(text.trim()).map_err(|e| {
            PipelineError::planning(format!("Planner output is not a JSON shot list: {}", e))
        })?;

        if shots.is_empty() {
            return Err(PipelineError::planning("Planner returned an empty shot list"));
        }

        info!("Planner produced {} shots", shots.len());

        Ok(shots
            .into_iter()
            .map(|s| PlannedShot {
                spoken_text: s.segment.trim().to_string(),
                visual_prompt: s.prompt.trim().to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl ClipVerifier for GeminiClient {
    async fn verify(
        &self,
        clip_url: &str,
        spoken_text: &str,
        visual_prompt: &str,
    ) -> PipelineResult<VerificationOutcome> {
        // The vision model takes the clip inline; fetch it through the signed URL.
        let video_bytes = self
            .client
            .get(clip_url)
            .send()
            .await
            .map_err(|e| PipelineError::transient(format!("Clip fetch failed: {}", e)))?
            .bytes()
            .await
            .map_err(|e| PipelineError::transient(format!("Clip fetch failed: {}", e)))?;

        use base64::Engine as _;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&video_bytes);

        let instruction = format!(
            "Assess how well this video matches its intent. Expected dialogue: \
             \"{}\". Intended visuals: \"{}\". Respond with JSON only: \
             {{\"confidence_score\": <0.0-1.0>, \"description\": \"what the video \
             shows\", \"feedback\": \"how well dialogue and visuals align\"}}",
            spoken_text, visual_prompt,
        );

        let text = self
            .generate(vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: "video/mp4".to_string(),
                        data: encoded,
                    },
                },
                Part::Text { text: instruction },
            ])
            .await?;

        let parsed: VerificationJson = serde_json::from_str(text.trim()).map_err(|e| {
            warn!("Unparseable verification response: {}", e);
            PipelineError::transient(format!("Unparseable verification response: {}", e))
        })?;

        Ok(VerificationOutcome {
            confidence: parsed.confidence_score.clamp(0.0, 1.0),
            visual_description: parsed.description,
            feedback: parsed.feedback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_prompt_carries_script_and_rules() {
        let request = PlanRequest {
            script: "Buy our shoes. They are fast.",
            character_name: "Maya",
            target_seconds_per_clip: 7,
            corrective_note: None,
        };
        let prompt = GeminiClient::planning_prompt(&request);
        assert!(prompt.contains("Buy our shoes. They are fast."));
        assert!(prompt.contains("Maya"));
        assert!(prompt.contains("7 seconds"));
        assert!(!prompt.contains("Correction:"));
    }

    #[test]
    fn test_planning_prompt_appends_corrective_note() {
        let request = PlanRequest {
            script: "Buy now.",
            character_name: "character",
            target_seconds_per_clip: 7,
            corrective_note: Some("the previous answer dropped a sentence"),
        };
        let prompt = GeminiClient::planning_prompt(&request);
        assert!(prompt.contains("Correction: the previous answer dropped a sentence"));
    }

    #[test]
    fn test_shot_json_parses_model_output() {
        let text = r#"[{"segment": "Buy now.", "prompt": "close-up, studio"}]"#;
        let shots: Vec<ShotJson> = serde_json::from_str(text).unwrap();
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].segment, "Buy now.");
    }
}
