//! Pipeline configuration.

use std::time::Duration;

/// Configuration for the ad creation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target duration per clip in seconds
    pub target_clip_seconds: u32,
    /// Transient attempts per clip before it fails
    pub max_transient_attempts: u32,
    /// Base delay for external retry backoff
    pub backoff_base: Duration,
    /// Cap on external retry backoff
    pub backoff_max: Duration,
    /// Planning step budget
    pub planning_timeout: Duration,
    /// Per-clip generation budget
    pub clip_timeout: Duration,
    /// Whole-job wall clock budget
    pub job_timeout: Duration,
    /// Whether the voiceover replacement step runs at all
    pub enable_voice_enhancement: bool,
    /// TTL for signed URLs handed to the mux tool
    pub mux_url_ttl: Duration,
    /// TTL for the published final video URL
    pub publish_url_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_clip_seconds: 7,
            max_transient_attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(30),
            planning_timeout: Duration::from_secs(120),
            clip_timeout: Duration::from_secs(600),
            job_timeout: Duration::from_secs(3600),
            enable_voice_enhancement: true,
            mux_url_ttl: Duration::from_secs(3600),
            publish_url_ttl: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            target_clip_seconds: env_parse("PIPELINE_CLIP_SECONDS", defaults.target_clip_seconds),
            max_transient_attempts: env_parse(
                "PIPELINE_MAX_ATTEMPTS",
                defaults.max_transient_attempts,
            ),
            backoff_base: Duration::from_secs(env_parse("PIPELINE_BACKOFF_BASE_SECS", 2)),
            backoff_max: Duration::from_secs(env_parse("PIPELINE_BACKOFF_MAX_SECS", 30)),
            planning_timeout: Duration::from_secs(env_parse("PIPELINE_PLANNING_TIMEOUT_SECS", 120)),
            clip_timeout: Duration::from_secs(env_parse("PIPELINE_CLIP_TIMEOUT_SECS", 600)),
            job_timeout: Duration::from_secs(env_parse("PIPELINE_JOB_TIMEOUT_SECS", 3600)),
            enable_voice_enhancement: std::env::var("PIPELINE_VOICE_ENHANCEMENT")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            mux_url_ttl: Duration::from_secs(env_parse("PIPELINE_MUX_URL_TTL_SECS", 3600)),
            publish_url_ttl: Duration::from_secs(env_parse(
                "PIPELINE_PUBLISH_URL_TTL_SECS",
                7 * 24 * 3600,
            )),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_step_budgets() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_clip_seconds, 7);
        assert_eq!(config.max_transient_attempts, 3);
        assert_eq!(config.planning_timeout, Duration::from_secs(120));
        assert_eq!(config.clip_timeout, Duration::from_secs(600));
        assert_eq!(config.job_timeout, Duration::from_secs(3600));
        assert_eq!(config.backoff_max, Duration::from_secs(30));
        assert_eq!(config.publish_url_ttl, Duration::from_secs(604_800));
    }
}
