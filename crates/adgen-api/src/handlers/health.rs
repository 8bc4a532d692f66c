//! Health check.

use axum::Json;
use serde_json::json;

/// Report service health and tool availability.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "ffmpeg": adgen_media::check_ffmpeg().is_ok(),
        "text_model_configured": std::env::var("GEMINI_API_KEY").is_ok(),
        "speech_model_configured": std::env::var("ELEVENLABS_API_KEY").is_ok(),
    }))
}
