use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use vidtally_core::ffmpeg;
use vidtally_core::run::RunContext;

use crate::error::{PipelineError, Stage};
use crate::settings::PipelineSettings;

/// Outcome of decoding an upload into frames.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    /// Frames written to the run's frames directory.
    pub frames: usize,
    /// Source duration reported by ffprobe, when probing succeeded.
    pub source_duration_secs: Option<f64>,
    /// `ceil(duration × sample_fps)`, when the duration is known.
    pub expected_frames: Option<u64>,
    pub elapsed_ms: u64,
}

/// Decode `video_path` into `ctx.frames_dir` at the configured sample rate.
///
/// The frames directory is cleared first. Probing the duration is
/// best-effort and only feeds the summary.
pub async fn extract_frames(
    settings: &PipelineSettings,
    ctx: &RunContext,
    video_path: &Path,
) -> Result<ExtractionSummary, PipelineError> {
    let started = Instant::now();

    let frames = ffmpeg::extract_frames(
        &settings.ffmpeg,
        video_path,
        &ctx.frames_dir,
        settings.sample_fps,
    )
    .await
    .map_err(|e| PipelineError::ffmpeg(Stage::Extract, e))?;

    let source_duration_secs = match ffmpeg::probe_video(&settings.ffmpeg, video_path).await {
        Ok(probe) => Some(ffmpeg::parse_duration(&probe)).filter(|d| *d > 0.0),
        Err(e) => {
            tracing::warn!(run_id = %ctx.id, error = %e, "Could not probe source duration");
            None
        }
    };
    let expected_frames =
        source_duration_secs.map(|d| ffmpeg::expected_frame_count(d, settings.sample_fps));

    let summary = ExtractionSummary {
        frames: frames.len(),
        source_duration_secs,
        expected_frames,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        run_id = %ctx.id,
        frames = summary.frames,
        expected = ?summary.expected_frames,
        elapsed_ms = summary.elapsed_ms,
        "Frame extraction finished"
    );
    Ok(summary)
}
