//! FFmpeg/FFprobe command wrappers.
//!
//! The two media stages of a run go through here: decoding an uploaded video
//! into numbered JPEG frames, and re-encoding annotated frames into the
//! output video. Every failure comes back as an [`FfmpegError`]; nothing is
//! swallowed.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;

use crate::frames::{self, FrameFile, FRAME_PATTERN};

/// Codec used for the assembled video. H.264 in yuv420p plays everywhere.
pub const OUTPUT_VIDEO_CODEC: &str = "libx264";
pub const OUTPUT_PIXEL_FORMAT: &str = "yuv420p";

/// yuv420p needs even width and height; odd sizes are scaled down by one pixel.
const EVEN_DIMENSIONS_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

/// Number of stderr lines kept in [`FfmpegError::ExecutionFailed`].
const STDERR_TAIL_LINES: usize = 20;

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("video file not found: {0}")]
    VideoNotFound(String),

    #[error("no frames found in {0}")]
    NoFrames(String),
}

/// Locations of the ffmpeg and ffprobe executables.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegTools {
    /// Whether `ffmpeg -version` runs successfully.
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.ffmpeg)
            .arg("-version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
pub async fn probe_video(tools: &FfmpegTools, path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ));
    }

    let output = tokio::process::Command::new(&tools.ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(execution_failed(&output));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))
}

/// Decode `video_path` into `frames_dir` as `frame_0001.jpg`, `frame_0002.jpg`,
/// ... sampled at `sample_fps` frames per second.
///
/// `frames_dir` is removed and recreated first, so frames from an earlier
/// extraction never mix with the new ones. Returns the extracted frames in
/// sequence order.
pub async fn extract_frames(
    tools: &FfmpegTools,
    video_path: &Path,
    frames_dir: &Path,
    sample_fps: f64,
) -> Result<Vec<FrameFile>, FfmpegError> {
    if !video_path.exists() {
        return Err(FfmpegError::VideoNotFound(
            video_path.to_string_lossy().to_string(),
        ));
    }

    reset_dir(frames_dir).await?;

    let started = Instant::now();
    let output = tokio::process::Command::new(&tools.ffmpeg)
        .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
        .arg(video_path)
        .args(["-vf", &format!("fps={sample_fps}")])
        .arg(frames_dir.join(FRAME_PATTERN))
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(execution_failed(&output));
    }

    let frames = frames::list_frames_async(frames_dir).await?;
    if frames.is_empty() {
        return Err(FfmpegError::NoFrames(
            frames_dir.to_string_lossy().to_string(),
        ));
    }

    tracing::debug!(
        video = %video_path.display(),
        frames = frames.len(),
        sample_fps,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Extracted frames"
    );
    Ok(frames)
}

/// Encode the `frame_NNNN.jpg` sequence in `frames_dir` into `output_path`
/// at `fps`, overwriting any existing file.
///
/// The sequence starts at the lowest frame number present. ffmpeg stops at
/// the first gap in the numbering, so callers fill gaps beforehand.
pub async fn assemble_video(
    tools: &FfmpegTools,
    frames_dir: &Path,
    output_path: &Path,
    fps: f64,
) -> Result<(), FfmpegError> {
    let numbered: Vec<u32> = match frames::list_frames_async(frames_dir).await {
        Ok(frames) => frames.iter().filter_map(|f| f.index).collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    let Some(&start_number) = numbered.first() else {
        return Err(FfmpegError::NoFrames(
            frames_dir.to_string_lossy().to_string(),
        ));
    };

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let started = Instant::now();
    let output = tokio::process::Command::new(&tools.ffmpeg)
        .args(["-y", "-hide_banner", "-loglevel", "error"])
        .args(["-framerate", &fps.to_string()])
        .args(["-start_number", &start_number.to_string(), "-i"])
        .arg(frames_dir.join(FRAME_PATTERN))
        .args(["-vf", EVEN_DIMENSIONS_FILTER])
        .args(["-c:v", OUTPUT_VIDEO_CODEC, "-pix_fmt", OUTPUT_PIXEL_FORMAT])
        .arg(output_path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(execution_failed(&output));
    }

    tracing::debug!(
        output = %output_path.display(),
        frames = numbered.len(),
        fps,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Assembled video"
    );
    Ok(())
}

/// Number of frames sampling a `duration_secs` clip at `sample_fps` yields.
pub fn expected_frame_count(duration_secs: f64, sample_fps: f64) -> u64 {
    if duration_secs <= 0.0 || sample_fps <= 0.0 {
        return 0;
    }
    (duration_secs * sample_fps).ceil() as u64
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn reset_dir(dir: &Path) -> Result<(), FfmpegError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

fn execution_failed(output: &std::process::Output) -> FfmpegError {
    FfmpegError::ExecutionFailed {
        exit_code: output.status.code(),
        stderr: stderr_tail(&String::from_utf8_lossy(&output.stderr)),
    }
}

/// Keep the last few lines of ffmpeg's stderr; the cause is at the end.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    // Format-level duration first, then the video stream's.
    if let Some(secs) = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
    {
        return secs;
    }
    first_video_stream(probe)
        .and_then(|s| s.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Parse the video framerate from ffprobe output.
///
/// The `r_frame_rate` field is a fraction like `"30/1"` or `"24000/1001"`.
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    first_video_stream(probe)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(0.0)
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    if let Some((num, den)) = s.split_once('/') {
        let num = num.parse::<f64>().unwrap_or(0.0);
        let den = den.parse::<f64>().unwrap_or(1.0);
        return if den > 0.0 { num / den } else { 0.0 };
    }
    s.parse::<f64>().unwrap_or(0.0)
}
