use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use vidtally_core::ffmpeg;
use vidtally_core::frames::{self, frame_file_name};
use vidtally_core::run::RunContext;

use crate::error::{PipelineError, Stage};
use crate::settings::PipelineSettings;

/// Outcome of encoding the annotated frames.
#[derive(Debug, Clone, Serialize)]
pub struct AssemblySummary {
    pub video_path: PathBuf,
    /// Frames in the encoded sequence, gap fillers included.
    pub frames: usize,
    /// Missing frame numbers that were filled with the previous frame.
    pub filled_gaps: Vec<u32>,
    /// Expected playback length, `frames / fps`.
    pub duration_secs: f64,
    pub elapsed_ms: u64,
}

/// Encode `ctx.annotated_dir` into the run's output video.
///
/// Frames skipped during detection leave holes in the numbering, which
/// would end ffmpeg's image sequence early. Each hole is filled with a copy
/// of the frame before it so the video keeps `frames / fps` seconds.
pub async fn assemble_video(
    settings: &PipelineSettings,
    ctx: &RunContext,
) -> Result<AssemblySummary, PipelineError> {
    let started = Instant::now();

    let filled_gaps = fill_sequence_gaps(&ctx.annotated_dir)
        .await
        .map_err(|e| PipelineError::io(Stage::Assemble, e))?;
    if !filled_gaps.is_empty() {
        tracing::warn!(run_id = %ctx.id, gaps = ?filled_gaps, "Filled gaps in annotated frame sequence");
    }

    let video_path = ctx.video_path();
    ffmpeg::assemble_video(
        &settings.ffmpeg,
        &ctx.annotated_dir,
        &video_path,
        settings.output_fps,
    )
    .await
    .map_err(|e| PipelineError::ffmpeg(Stage::Assemble, e))?;

    let frames = frames::list_frames_async(&ctx.annotated_dir)
        .await
        .map_err(|e| PipelineError::io(Stage::Assemble, e))?
        .into_iter()
        .filter(|f| f.index.is_some())
        .count();

    let summary = AssemblySummary {
        video_path,
        frames,
        filled_gaps,
        duration_secs: if settings.output_fps > 0.0 {
            frames as f64 / settings.output_fps
        } else {
            0.0
        },
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        run_id = %ctx.id,
        frames = summary.frames,
        duration_secs = summary.duration_secs,
        elapsed_ms = summary.elapsed_ms,
        "Video assembly finished"
    );
    Ok(summary)
}

/// Copy the preceding frame into every missing number between the first
/// and last numbered frame. Returns the numbers that were filled.
pub async fn fill_sequence_gaps(dir: &Path) -> std::io::Result<Vec<u32>> {
    let indices: Vec<u32> = match frames::list_frames_async(dir).await {
        Ok(frames) => frames.iter().filter_map(|f| f.index).collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut filled = Vec::new();
    for pair in indices.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        for missing in prev + 1..next {
            tokio::fs::copy(
                dir.join(frame_file_name(prev)),
                dir.join(frame_file_name(missing)),
            )
            .await?;
            filled.push(missing);
        }
    }
    Ok(filled)
}
