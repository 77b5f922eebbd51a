//! FfmpegService - video/audio probing, transcoding, watermark overlay,
//! preview clips and first-frame thumbnails.
//!
//! Availability is checked per invocation, not cached, because the binaries
//! may be provisioned or removed independently of this service's lifetime.
//! Every invocation runs under a bounded wall-clock timeout and the child
//! process is killed when the future is dropped.

use anyhow::{anyhow, Context, Result};
use atelier_core::models::{AudioMetadata, VideoMetadata};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Validate that a path doesn't contain shell metacharacters or dangerous sequences
fn validate_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }

    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }

    Ok(())
}

fn validate_and_canonicalize_path(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    validate_path(&path_str)?;

    if path.exists() {
        path.canonicalize()
            .map_err(|e| anyhow!("Failed to canonicalize path: {}", e))
    } else {
        if let Some(parent) = path.parent() {
            parent
                .canonicalize()
                .map_err(|e| anyhow!("Failed to canonicalize parent path: {}", e))?;
        }
        Ok(path.to_path_buf())
    }
}

#[derive(Clone)]
pub struct FfmpegService {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
}

impl FfmpegService {
    pub fn new(ffmpeg_path: String, ffprobe_path: String, timeout: Duration) -> Result<Self> {
        validate_path(&ffmpeg_path).context("Invalid ffmpeg_path")?;
        validate_path(&ffprobe_path).context("Invalid ffprobe_path")?;

        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
            timeout,
        })
    }

    /// Whether both binaries are resolvable right now. Checked per call, not
    /// cached.
    pub fn is_available(&self) -> bool {
        which::which(&self.ffmpeg_path).is_ok() && which::which(&self.ffprobe_path).is_ok()
    }

    /// Run a tool to completion under the configured timeout. A timeout is an
    /// error on this sub-task; kill_on_drop stops the child rather than
    /// detaching from it.
    async fn run(&self, program: &str, args: &[String]) -> Result<Vec<u8>> {
        let start = std::time::Instant::now();

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                anyhow!(
                    "{} timed out after {} seconds",
                    program,
                    self.timeout.as_secs()
                )
            })?
            .with_context(|| format!("Failed to wait for {}", program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("{} failed: {}", program, stderr));
        }

        tracing::debug!(
            program = %program,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "External tool completed"
        );

        Ok(output.stdout)
    }

    async fn probe_json(&self, media_path: &Path) -> Result<serde_json::Value> {
        let validated = validate_and_canonicalize_path(media_path).context("Invalid media path")?;

        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            validated.to_string_lossy().to_string(),
        ];

        let stdout = self.run(&self.ffprobe_path, &args).await?;
        serde_json::from_slice(&stdout).context("Failed to parse ffprobe output")
    }

    /// Probe video metadata from a file path.
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "probe_video"))]
    pub async fn probe_video(&self, video_path: &Path) -> Result<VideoMetadata> {
        let probe = self.probe_json(video_path).await?;

        let streams = probe["streams"].as_array().cloned().unwrap_or_default();
        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"].as_str() == Some("video"));
        let audio_stream = streams
            .iter()
            .find(|s| s["codec_type"].as_str() == Some("audio"));
        let format = &probe["format"];

        let frame_rate = video_stream
            .and_then(|s| s["r_frame_rate"].as_str())
            .and_then(parse_frame_rate);

        let has_timecode = video_stream
            .map(|s| !s["tags"]["timecode"].is_null())
            .unwrap_or(false)
            || !format["tags"]["timecode"].is_null();

        let metadata = VideoMetadata {
            width: video_stream.and_then(|s| s["width"].as_u64()).map(|w| w as u32),
            height: video_stream.and_then(|s| s["height"].as_u64()).map(|h| h as u32),
            duration_seconds: format["duration"]
                .as_str()
                .and_then(|d| d.parse::<f64>().ok()),
            frame_rate,
            codec: video_stream
                .and_then(|s| s["codec_name"].as_str())
                .map(String::from),
            color_space: video_stream
                .and_then(|s| s["color_space"].as_str())
                .map(String::from),
            has_timecode,
            audio_codec: audio_stream
                .and_then(|s| s["codec_name"].as_str())
                .map(String::from),
        };

        tracing::info!(
            width = ?metadata.width,
            height = ?metadata.height,
            duration = ?metadata.duration_seconds,
            codec = ?metadata.codec,
            "Video probe completed"
        );

        Ok(metadata)
    }

    /// Probe audio metadata from a file path. Extraction only, no decode.
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "probe_audio"))]
    pub async fn probe_audio(&self, audio_path: &Path) -> Result<AudioMetadata> {
        let probe = self.probe_json(audio_path).await?;

        let streams = probe["streams"].as_array().cloned().unwrap_or_default();
        let audio_stream = streams
            .iter()
            .find(|s| s["codec_type"].as_str() == Some("audio"));
        let format = &probe["format"];

        Ok(AudioMetadata {
            duration_seconds: format["duration"]
                .as_str()
                .and_then(|d| d.parse::<f64>().ok()),
            bitrate: format["bit_rate"].as_str().and_then(|b| b.parse::<u64>().ok()),
            sample_rate: audio_stream
                .and_then(|s| s["sample_rate"].as_str())
                .and_then(|r| r.parse::<u32>().ok()),
            channels: audio_stream
                .and_then(|s| s["channels"].as_u64())
                .map(|c| c as u32),
        })
    }

    /// Normalize an arbitrary container/codec to mp4 (h264/aac, faststart).
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "convert"))]
    pub async fn convert_to_mp4(&self, input: &Path, output: &Path) -> Result<()> {
        let input = validate_and_canonicalize_path(input).context("Invalid input path")?;
        let output = validate_and_canonicalize_path(output).context("Invalid output path")?;

        let args = vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];

        self.run(&self.ffmpeg_path, &args).await?;
        Ok(())
    }

    /// Overlay the watermark tile across the whole frame and re-encode.
    ///
    /// The tile is stretched to the frame with scale2ref; the grid and
    /// wordmark stay legible at any aspect ratio.
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "watermark"))]
    pub async fn watermark_video(
        &self,
        input: &Path,
        tile_png: &Path,
        output: &Path,
    ) -> Result<()> {
        let input = validate_and_canonicalize_path(input).context("Invalid input path")?;
        let tile = validate_and_canonicalize_path(tile_png).context("Invalid tile path")?;
        let output = validate_and_canonicalize_path(output).context("Invalid output path")?;

        let args = vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-i".to_string(),
            tile.to_string_lossy().to_string(),
            "-filter_complex".to_string(),
            "[1:v][0:v]scale2ref=w=iw:h=ih[wm][vid];[vid][wm]overlay=0:0:format=auto".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-c:a".to_string(),
            "copy".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];

        self.run(&self.ffmpeg_path, &args).await?;
        Ok(())
    }

    /// Cut a short clip from the start of the video, optionally watermarked
    /// in the same pass.
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "clip"))]
    pub async fn extract_clip(
        &self,
        input: &Path,
        duration_seconds: f64,
        tile_png: Option<&Path>,
        output: &Path,
    ) -> Result<()> {
        let input = validate_and_canonicalize_path(input).context("Invalid input path")?;
        let output = validate_and_canonicalize_path(output).context("Invalid output path")?;

        let mut args = vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
        ];

        if let Some(tile) = tile_png {
            let tile = validate_and_canonicalize_path(tile).context("Invalid tile path")?;
            args.extend_from_slice(&[
                "-i".to_string(),
                tile.to_string_lossy().to_string(),
                "-filter_complex".to_string(),
                "[1:v][0:v]scale2ref=w=iw:h=ih[wm][vid];[vid][wm]overlay=0:0:format=auto"
                    .to_string(),
            ]);
        }

        args.extend_from_slice(&[
            "-t".to_string(),
            format!("{:.3}", duration_seconds),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-an".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ]);

        self.run(&self.ffmpeg_path, &args).await?;
        Ok(())
    }

    /// Extract the first decodable frame as a JPEG.
    #[tracing::instrument(skip(self), fields(ffmpeg.operation = "first_frame"))]
    pub async fn first_frame(&self, input: &Path, output: &Path) -> Result<()> {
        let input = validate_and_canonicalize_path(input).context("Invalid input path")?;
        let output = validate_and_canonicalize_path(output).context("Invalid output path")?;

        let args = vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];

        self.run(&self.ffmpeg_path, &args).await?;
        Ok(())
    }
}

fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = raw.split_once('/')?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30000/1001"), Some(30000.0 / 1001.0));
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("not-a-rate"), None);
    }

    #[test]
    fn test_dangerous_paths_rejected() {
        assert!(validate_path("/usr/bin/ffmpeg").is_ok());
        assert!(validate_path("ffmpeg; rm -rf /").is_err());
        assert!(validate_path("../../etc/passwd").is_err());
        assert!(validate_path("video$(whoami).mp4").is_err());
    }

    #[test]
    fn test_unavailable_tool_detected() {
        let service = FfmpegService::new(
            "/nonexistent/ffmpeg".to_string(),
            "/nonexistent/ffprobe".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!service.is_available());
    }
}
