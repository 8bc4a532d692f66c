//! Script segments paired with visual prompts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One shot's dialogue plus the visual instruction for the video model.
///
/// Segments are dense and ordered: index `i` drives clip `i`, and the
/// concatenation of `spoken_text` over all segments equals the normalized
/// script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    /// 0-based position in the shot list
    pub index: u32,

    /// Verbatim subset of the normalized script spoken in this shot
    pub spoken_text: String,

    /// Camera framing, subject action and setting for the video model.
    /// Never contains the spoken line; that is delivered separately so the
    /// engine can drive lip-sync.
    pub visual_prompt: String,
}

/// Check that segments jointly reproduce the script, ignoring whitespace.
pub fn segments_cover_script(segments: &[Segment], script: &str) -> bool {
    let joined: String = segments
        .iter()
        .map(|s| s.spoken_text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    squeeze(&joined) == squeeze(script)
}

fn squeeze(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: u32, text: &str) -> Segment {
        Segment {
            index,
            spoken_text: text.to_string(),
            visual_prompt: "wide shot".to_string(),
        }
    }

    #[test]
    fn test_segments_cover_script() {
        let segments = vec![seg(0, "Buy our shoes."), seg(1, "They are fast.")];
        assert!(segments_cover_script(&segments, "Buy our shoes. They are fast."));
    }

    #[test]
    fn test_whitespace_differences_ignored() {
        let segments = vec![seg(0, "Buy  our shoes."), seg(1, " They are fast. ")];
        assert!(segments_cover_script(&segments, "Buy our shoes.\nThey are fast."));
    }

    #[test]
    fn test_missing_sentence_detected() {
        let segments = vec![seg(0, "Buy our shoes.")];
        assert!(!segments_cover_script(&segments, "Buy our shoes. They are fast."));
    }

    #[test]
    fn test_reworded_text_detected() {
        let segments = vec![seg(0, "Purchase our shoes."), seg(1, "They are fast.")];
        assert!(!segments_cover_script(&segments, "Buy our shoes. They are fast."));
    }
}
