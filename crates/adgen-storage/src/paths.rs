//! Canonical artifact key layout.
//!
//! Keys are hierarchical under `{user_id}/{job_id}/` and stable: recovery and
//! auditing both depend on these exact paths.

/// Key builder for one job's artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    prefix: String,
}

impl ArtifactPaths {
    /// Build the key space for a job.
    pub fn new(user_id: &str, job_id: &str) -> Self {
        Self {
            prefix: format!("{}/{}", user_id, job_id),
        }
    }

    /// Root prefix for the job, no trailing slash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The uploaded character reference image.
    pub fn character_image(&self) -> String {
        format!("{}/character_image.png", self.prefix)
    }

    /// Clip artifact at the given index.
    pub fn clip(&self, index: u32) -> String {
        format!("{}/clips/clip_{}.mp4", self.prefix, index)
    }

    /// Prefix under which all clip artifacts live, with trailing slash.
    pub fn clips_prefix(&self) -> String {
        format!("{}/clips/", self.prefix)
    }

    /// Persisted visual prompt for the given clip index.
    pub fn prompt(&self, index: u32) -> String {
        format!("{}/prompts/prompt_{}.txt", self.prefix, index)
    }

    /// Concatenated video before audio replacement.
    pub fn merged(&self) -> String {
        format!("{}/merged.mp4", self.prefix)
    }

    /// Final published video.
    pub fn final_video(&self) -> String {
        format!("{}/final.mp4", self.prefix)
    }

    /// Parse a clip index out of a key under `clips/`.
    ///
    /// Returns `None` for keys that are not canonical clip artifacts.
    pub fn parse_clip_index(&self, key: &str) -> Option<u32> {
        let name = key.strip_prefix(&self.clips_prefix())?;
        let stem = name.strip_prefix("clip_")?.strip_suffix(".mp4")?;
        stem.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_paths() {
        let paths = ArtifactPaths::new("user-1", "ad_42");
        assert_eq!(paths.character_image(), "user-1/ad_42/character_image.png");
        assert_eq!(paths.clip(0), "user-1/ad_42/clips/clip_0.mp4");
        assert_eq!(paths.prompt(3), "user-1/ad_42/prompts/prompt_3.txt");
        assert_eq!(paths.merged(), "user-1/ad_42/merged.mp4");
        assert_eq!(paths.final_video(), "user-1/ad_42/final.mp4");
    }

    #[test]
    fn test_parse_clip_index() {
        let paths = ArtifactPaths::new("user-1", "ad_42");
        assert_eq!(paths.parse_clip_index("user-1/ad_42/clips/clip_7.mp4"), Some(7));
        assert_eq!(paths.parse_clip_index("user-1/ad_42/clips/clip_07.mp4"), Some(7));
        assert_eq!(paths.parse_clip_index("user-1/ad_42/clips/last_frame.png"), None);
        assert_eq!(paths.parse_clip_index("user-1/other/clips/clip_1.mp4"), None);
    }

    #[test]
    fn test_clip_round_trip() {
        let paths = ArtifactPaths::new("u", "j");
        for index in [0u32, 1, 12, 99] {
            assert_eq!(paths.parse_clip_index(&paths.clip(index)), Some(index));
        }
    }
}
