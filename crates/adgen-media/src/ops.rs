//! Mux tool operations: concat, audio replacement, last-frame extraction.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Default wall clock for a single ffmpeg invocation.
const FFMPEG_TIMEOUT_SECS: u64 = 300;

/// Concatenate clips referenced by URL or local path into one video.
///
/// Builds a concat-protocol manifest inside `work_dir` and invokes ffmpeg
/// with the HTTPS protocols whitelisted so signed artifact URLs stream
/// directly into the tool; no clip is downloaded to the host.
pub async fn concat_clips(
    clip_refs: &[String],
    output: impl AsRef<Path>,
    work_dir: impl AsRef<Path>,
) -> MediaResult<()> {
    let output = output.as_ref();

    if clip_refs.is_empty() {
        return Err(MediaError::InvalidVideo("no clips to concatenate".into()));
    }

    let manifest = write_concat_manifest(clip_refs, work_dir.as_ref()).await?;
    debug!("Concat manifest at {} with {} entries", manifest.display(), clip_refs.len());

    let cmd = FfmpegCommand::new(output)
        .input_with_args(
            manifest.to_string_lossy(),
            [
                "-f",
                "concat",
                "-safe",
                "0",
                "-protocol_whitelist",
                "file,http,https,tcp,tls",
            ],
        )
        .output_args(["-c", "copy"]);

    FfmpegRunner::new()
        .with_timeout(FFMPEG_TIMEOUT_SECS)
        .run(&cmd)
        .await?;

    info!("Concatenated {} clips into {}", clip_refs.len(), output.display());
    Ok(())
}

async fn write_concat_manifest(clip_refs: &[String], work_dir: &Path) -> MediaResult<PathBuf> {
    let manifest = work_dir.join("concat.txt");

    let mut contents = String::new();
    for clip in clip_refs {
        // Single quotes in the concat format are escaped by closing, quoting
        // the quote, and reopening.
        let escaped = clip.replace('\'', "'\\''");
        contents.push_str(&format!("file '{}'\n", escaped));
    }

    tokio::fs::write(&manifest, contents).await?;
    Ok(manifest)
}

/// Replace the audio track of a video with the given audio file.
///
/// The video stream is copied untouched; audio is re-encoded to AAC and
/// trimmed to the shorter of the two streams.
pub async fn replace_audio(
    video: &str,
    audio: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let audio = audio.as_ref();
    let output = output.as_ref();

    if !audio.exists() {
        return Err(MediaError::FileNotFound(audio.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(output)
        .input_with_args(video, ["-protocol_whitelist", "file,http,https,tcp,tls"])
        .input(audio.to_string_lossy())
        .output_args([
            "-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-shortest",
        ]);

    FfmpegRunner::new()
        .with_timeout(FFMPEG_TIMEOUT_SECS)
        .run(&cmd)
        .await?;

    info!("Replaced audio track, wrote {}", output.display());
    Ok(())
}

/// Extract the last frame of a video as a PNG still.
///
/// Seeks relative to end-of-file and keeps overwriting a single output frame
/// so the final decoded frame wins.
pub async fn extract_last_frame(
    video: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let video = video.as_ref();
    let output = output.as_ref();

    if !video.exists() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(output)
        .input_with_args(video.to_string_lossy(), ["-sseof", "-1"])
        .output_args(["-update", "1", "-q:v", "2", "-frames:v", "1"]);

    FfmpegRunner::new().with_timeout(60).run(&cmd).await?;

    debug!("Extracted last frame of {} to {}", video.display(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manifest_lists_refs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let refs = vec![
            "https://store/clips/clip_0.mp4?sig=a".to_string(),
            "https://store/clips/clip_1.mp4?sig=b".to_string(),
        ];

        let manifest = write_concat_manifest(&refs, dir.path()).await.unwrap();
        let contents = tokio::fs::read_to_string(&manifest).await.unwrap();
        assert_eq!(
            contents,
            "file 'https://store/clips/clip_0.mp4?sig=a'\n\
             file 'https://store/clips/clip_1.mp4?sig=b'\n"
        );
    }

    #[tokio::test]
    async fn test_manifest_escapes_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let refs = vec!["it's.mp4".to_string()];

        let manifest = write_concat_manifest(&refs, dir.path()).await.unwrap();
        let contents = tokio::fs::read_to_string(&manifest).await.unwrap();
        assert!(contents.contains("it'\\''s.mp4"));
    }

    #[tokio::test]
    async fn test_concat_rejects_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let result = concat_clips(&[], dir.path().join("out.mp4"), dir.path()).await;
        assert!(matches!(result, Err(MediaError::InvalidVideo(_))));
    }

    #[tokio::test]
    async fn test_replace_audio_requires_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = replace_audio(
            "https://store/merged.mp4",
            dir.path().join("missing.mp3"),
            dir.path().join("out.mp4"),
        )
        .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
