use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use vidtally_core::frames::{self, FrameFile};
use vidtally_core::run::RunContext;
use vidtally_core::tally::{count_labels, FrameTally, TallyWriter};
use vidtally_detect::annotate::{annotate, LabelFont};
use vidtally_detect::{DetectError, ObjectDetector};

use crate::error::{PipelineError, Stage};

/// A frame that went through detection.
#[derive(Debug, Clone, Serialize)]
pub struct FrameOutcome {
    pub frame: String,
    pub detections: usize,
}

/// A frame that was skipped, and why.
#[derive(Debug, Clone, Serialize)]
pub struct FrameFailure {
    pub frame: String,
    pub reason: String,
}

/// Outcome of a detection pass. Partial: per-frame failures are listed,
/// not fatal.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionSummary {
    pub processed: Vec<FrameOutcome>,
    pub failed: Vec<FrameFailure>,
    pub report_path: PathBuf,
    /// Data rows written to the report.
    pub report_rows: usize,
    /// Counts per class over the whole run.
    pub totals: FrameTally,
    pub elapsed_ms: u64,
}

impl DetectionSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run detection over every frame of `ctx`, writing annotated copies to
/// `ctx.annotated_dir` and the tally report for `date` to `ctx.output_dir`.
///
/// Frames are visited in sequence-number order. A frame that cannot be
/// decoded, inferred, or saved is logged and recorded in
/// [`DetectionSummary::failed`]; the rest of the batch continues. Failing
/// to list frames or to write the report aborts the pass.
///
/// Blocking; call through [`detect_frames_blocking`] from async code.
pub fn detect_frames(
    detector: &dyn ObjectDetector,
    font: Option<&LabelFont>,
    ctx: &RunContext,
    date: NaiveDate,
) -> Result<DetectionSummary, PipelineError> {
    let started = Instant::now();
    let io_err = |e| PipelineError::io(Stage::Detect, e);

    let frames = frames::list_frames(&ctx.frames_dir).map_err(io_err)?;
    reset_dir(&ctx.annotated_dir).map_err(io_err)?;

    let mut report = TallyWriter::create(&ctx.report_path(date)).map_err(io_err)?;
    let mut processed = Vec::with_capacity(frames.len());
    let mut failed = Vec::new();
    let mut totals = FrameTally::new();

    for frame in &frames {
        match process_frame(detector, font, frame, &ctx.annotated_dir) {
            Ok(tally) => {
                report.write_frame(&frame.name, &tally).map_err(io_err)?;
                let detections = tally.values().map(|&c| c as usize).sum();
                for (label, count) in tally {
                    *totals.entry(label).or_insert(0) += count;
                }
                processed.push(FrameOutcome {
                    frame: frame.name.clone(),
                    detections,
                });
            }
            Err(e) => {
                tracing::warn!(run_id = %ctx.id, frame = %frame.name, error = %e, "Skipping frame");
                failed.push(FrameFailure {
                    frame: frame.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let report_rows = report.rows();
    let report_path = report.finish().map_err(io_err)?;

    let summary = DetectionSummary {
        processed,
        failed,
        report_path,
        report_rows,
        totals,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        run_id = %ctx.id,
        frames = frames.len(),
        failed = summary.failed.len(),
        rows = summary.report_rows,
        elapsed_ms = summary.elapsed_ms,
        "Detection pass finished"
    );
    Ok(summary)
}

/// [`detect_frames`] on the blocking thread pool.
pub async fn detect_frames_blocking(
    detector: Arc<dyn ObjectDetector>,
    font: Option<Arc<LabelFont>>,
    ctx: RunContext,
    date: NaiveDate,
) -> Result<DetectionSummary, PipelineError> {
    tokio::task::spawn_blocking(move || {
        detect_frames(detector.as_ref(), font.as_deref(), &ctx, date)
    })
    .await
    .map_err(|e| PipelineError::Aborted {
        stage: Stage::Detect,
        message: e.to_string(),
    })?
}

/// Detect, annotate and tally a single frame.
fn process_frame(
    detector: &dyn ObjectDetector,
    font: Option<&LabelFont>,
    frame: &FrameFile,
    annotated_dir: &Path,
) -> Result<FrameTally, DetectError> {
    let image = image::open(&frame.path)?.into_rgb8();
    let detections = detector.detect(&image)?;

    let names = detector.class_names();
    let annotated = annotate(&image, &detections, names, font);
    annotated.save(annotated_dir.join(&frame.name))?;

    Ok(count_labels(
        detections.iter().map(|d| names.name(d.class_id)),
    ))
}

fn reset_dir(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::fs::create_dir_all(dir)
}
