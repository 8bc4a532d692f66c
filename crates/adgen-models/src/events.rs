//! Progress events streamed to clients.
//!
//! Events are serialized onto a `text/event-stream` response as
//! `event: <name>\ndata: <json>\n\n`. A stream ends with either `complete`
//! or `error`; nothing follows a terminal event.

use schemars::JsonSchema;
use serde::Serialize;

/// One progress event in the ad creation stream.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum ProgressEvent {
    /// Planning started
    Step1 { step: u8, message: String, progress: u8 },

    /// Planning finished; the shot count is known
    Step1Complete {
        step: u8,
        message: String,
        total_clips: u32,
        progress: u8,
    },

    /// A clip finished inside the clip loop
    Step2Clip {
        step: u8,
        message: String,
        current_clip: u32,
        total_clips: u32,
        progress: u8,
    },

    /// Concatenation started
    Step3 { step: u8, message: String, progress: u8 },

    /// Voice enhancement started (absent when disabled)
    Step4 { step: u8, message: String, progress: u8 },

    /// Finalization started
    Step5 { step: u8, message: String, progress: u8 },

    /// Terminal success
    Complete {
        status: String,
        final_video_url: String,
        job_id: String,
    },

    /// Terminal failure
    Error { message: String },
}

impl ProgressEvent {
    /// SSE event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            ProgressEvent::Step1 { .. } => "step1",
            ProgressEvent::Step1Complete { .. } => "step1_complete",
            ProgressEvent::Step2Clip { .. } => "step2_clip",
            ProgressEvent::Step3 { .. } => "step3",
            ProgressEvent::Step4 { .. } => "step4",
            ProgressEvent::Step5 { .. } => "step5",
            ProgressEvent::Complete { .. } => "complete",
            ProgressEvent::Error { .. } => "error",
        }
    }

    /// Whether this event closes the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Complete { .. } | ProgressEvent::Error { .. })
    }

    /// The progress value carried by the event, if it has one.
    pub fn progress(&self) -> Option<u8> {
        match self {
            ProgressEvent::Step1 { progress, .. }
            | ProgressEvent::Step1Complete { progress, .. }
            | ProgressEvent::Step2Clip { progress, .. }
            | ProgressEvent::Step3 { progress, .. }
            | ProgressEvent::Step4 { progress, .. }
            | ProgressEvent::Step5 { progress, .. } => Some(*progress),
            ProgressEvent::Complete { .. } => Some(100),
            ProgressEvent::Error { .. } => None,
        }
    }

    pub fn step1(message: impl Into<String>) -> Self {
        ProgressEvent::Step1 {
            step: 1,
            message: message.into(),
            progress: 10,
        }
    }

    pub fn step1_complete(message: impl Into<String>, total_clips: u32) -> Self {
        ProgressEvent::Step1Complete {
            step: 1,
            message: message.into(),
            total_clips,
            progress: 20,
        }
    }

    pub fn step2_clip(
        message: impl Into<String>,
        current_clip: u32,
        total_clips: u32,
        progress: u8,
    ) -> Self {
        ProgressEvent::Step2Clip {
            step: 2,
            message: message.into(),
            current_clip,
            total_clips,
            progress,
        }
    }

    pub fn step3(message: impl Into<String>) -> Self {
        ProgressEvent::Step3 {
            step: 3,
            message: message.into(),
            progress: 60,
        }
    }

    pub fn step4(message: impl Into<String>) -> Self {
        ProgressEvent::Step4 {
            step: 4,
            message: message.into(),
            progress: 80,
        }
    }

    pub fn step5(message: impl Into<String>) -> Self {
        ProgressEvent::Step5 {
            step: 5,
            message: message.into(),
            progress: 95,
        }
    }

    pub fn complete(job_id: impl Into<String>, final_video_url: impl Into<String>) -> Self {
        ProgressEvent::Complete {
            status: "completed".into(),
            final_video_url: final_video_url.into(),
            job_id: job_id.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(ProgressEvent::step1("x").event_name(), "step1");
        assert_eq!(ProgressEvent::step1_complete("x", 3).event_name(), "step1_complete");
        assert_eq!(ProgressEvent::step2_clip("x", 1, 3, 33).event_name(), "step2_clip");
        assert_eq!(ProgressEvent::complete("j", "u").event_name(), "complete");
        assert_eq!(ProgressEvent::error("boom").event_name(), "error");
    }

    #[test]
    fn test_terminal_detection() {
        assert!(ProgressEvent::complete("j", "u").is_terminal());
        assert!(ProgressEvent::error("boom").is_terminal());
        assert!(!ProgressEvent::step3("merging").is_terminal());
    }

    #[test]
    fn test_progress_values() {
        assert_eq!(ProgressEvent::step1("x").progress(), Some(10));
        assert_eq!(ProgressEvent::step5("x").progress(), Some(95));
        assert_eq!(ProgressEvent::complete("j", "u").progress(), Some(100));
        assert_eq!(ProgressEvent::error("boom").progress(), None);
    }

    #[test]
    fn test_step2_payload_shape() {
        let event = ProgressEvent::step2_clip("Generated clip 2/3", 2, 3, 46);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["step"], 2);
        assert_eq!(json["current_clip"], 2);
        assert_eq!(json["total_clips"], 3);
        assert_eq!(json["progress"], 46);
    }

    #[test]
    fn test_complete_payload_shape() {
        let event = ProgressEvent::complete("ad_1", "https://store/final.mp4");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["job_id"], "ad_1");
        assert_eq!(json["final_video_url"], "https://store/final.mp4");
    }
}
