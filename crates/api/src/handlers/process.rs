use axum::extract::{Query, State};
use axum::response::Html;
use vidtally_core::error::CoreError;
use vidtally_core::run::RunStage;
use vidtally_pipeline::detect::detect_frames_blocking;

use crate::error::{AppError, AppResult};
use crate::handlers::{report_date, run_detached, RunQuery};
use crate::html;
use crate::state::AppState;

const NO_FRAMES: &str = "no frames have been extracted yet";

/// GET|POST /process
///
/// Runs detection over the target run's frames, replacing any earlier
/// annotated frames and same-day report.
pub async fn process_frames(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> AppResult<Html<String>> {
    let (run_id, handle) = state
        .runs
        .resolve(query.run_id()?)
        .await
        .map_err(|e| match e {
            CoreError::Conflict(_) => CoreError::Conflict(NO_FRAMES.to_string()),
            other => other,
        })?;
    let mut run = handle.lock_owned().await;
    run.require(RunStage::FramesReady, NO_FRAMES)?;

    let detector = state.detector.clone();
    let font = state.font.clone();
    let summary = run_detached(async move {
        let summary =
            detect_frames_blocking(detector, font, run.ctx.clone(), report_date()).await?;
        run.stage = RunStage::DetectionsReady;
        run.report_path = Some(summary.report_path.clone());
        Ok::<_, AppError>(summary)
    })
    .await?;

    Ok(Html(html::results_page(run_id, None, Some(&summary))))
}
