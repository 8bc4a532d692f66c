//! Ad job lifecycle status.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Job state across the pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdJobStatus {
    /// Job admitted, no work started
    #[default]
    Pending,
    /// Script is being segmented and prompted
    Planning,
    /// Clip loop is running
    GeneratingClips,
    /// Clips are being checked against the script
    Verifying,
    /// Clips are being concatenated
    Merging,
    /// Voiceover is being synthesized and muxed
    EnhancingVoice,
    /// Final artifact is being published
    Finalizing,
    /// Job finished with a final video
    Completed,
    /// Job aborted; error_message carries the reason
    Failed,
}

impl AdJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdJobStatus::Pending => "pending",
            AdJobStatus::Planning => "planning",
            AdJobStatus::GeneratingClips => "generating_clips",
            AdJobStatus::Verifying => "verifying",
            AdJobStatus::Merging => "merging",
            AdJobStatus::EnhancingVoice => "enhancing_voice",
            AdJobStatus::Finalizing => "finalizing",
            AdJobStatus::Completed => "completed",
            AdJobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, AdJobStatus::Completed | AdJobStatus::Failed)
    }
}

impl std::fmt::Display for AdJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AdJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AdJobStatus::Pending),
            "planning" => Ok(AdJobStatus::Planning),
            "generating_clips" => Ok(AdJobStatus::GeneratingClips),
            "verifying" => Ok(AdJobStatus::Verifying),
            "merging" => Ok(AdJobStatus::Merging),
            "enhancing_voice" => Ok(AdJobStatus::EnhancingVoice),
            "finalizing" => Ok(AdJobStatus::Finalizing),
            "completed" => Ok(AdJobStatus::Completed),
            "failed" => Ok(AdJobStatus::Failed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            AdJobStatus::Pending,
            AdJobStatus::Planning,
            AdJobStatus::GeneratingClips,
            AdJobStatus::Verifying,
            AdJobStatus::Merging,
            AdJobStatus::EnhancingVoice,
            AdJobStatus::Finalizing,
            AdJobStatus::Completed,
            AdJobStatus::Failed,
        ] {
            let parsed: AdJobStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(AdJobStatus::Completed.is_terminal());
        assert!(AdJobStatus::Failed.is_terminal());
        assert!(!AdJobStatus::GeneratingClips.is_terminal());
    }
}
