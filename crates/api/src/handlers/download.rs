//! Video assembly and file downloads.

use axum::extract::{Query, State};
use axum::response::{Html, Response};
use vidtally_core::error::CoreError;
use vidtally_core::run::RunStage;
use vidtally_pipeline::assemble::assemble_video;

use crate::error::{AppError, AppResult};
use crate::handlers::files::attachment;
use crate::handlers::{run_detached, RunQuery};
use crate::html;
use crate::state::AppState;

const NO_DETECTIONS: &str = "no detection pass has run yet";

/// GET /download
///
/// Assembles the annotated frames into the run's output video.
pub async fn download_video(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> AppResult<Html<String>> {
    let (run_id, handle) = state
        .runs
        .resolve(query.run_id()?)
        .await
        .map_err(|e| match e {
            CoreError::Conflict(_) => CoreError::Conflict(NO_DETECTIONS.to_string()),
            other => other,
        })?;
    let mut run = handle.lock_owned().await;
    run.require(RunStage::DetectionsReady, NO_DETECTIONS)?;

    let settings = state.settings.clone();
    let summary = run_detached(async move {
        let summary = assemble_video(&settings, &run.ctx).await?;
        run.stage = RunStage::VideoReady;
        Ok::<_, AppError>(summary)
    })
    .await?;

    Ok(Html(html::download_page(run_id, &summary)))
}

/// GET /download_video_file
///
/// Streams the assembled video as an attachment. 404 until `/download`
/// has succeeded for the run.
pub async fn download_video_file(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> AppResult<Response> {
    let run_id = query.run_id()?;
    let (_, handle) = state
        .runs
        .resolve(run_id)
        .await
        .map_err(|e| not_found_unless_known(e, "Output video"))?;
    let run = handle.lock().await;
    if run.stage < RunStage::VideoReady {
        return Err(CoreError::NotFound {
            entity: "Output video",
            id: run.ctx.id.to_string(),
        }
        .into());
    }
    attachment(&run.ctx.video_path(), "Output video").await
}

/// GET /download_report
///
/// Streams the CSV written by the run's latest detection pass.
pub async fn download_report(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
) -> AppResult<Response> {
    let (_, handle) = state
        .runs
        .resolve(query.run_id()?)
        .await
        .map_err(|e| not_found_unless_known(e, "Report"))?;
    let run = handle.lock().await;
    let Some(path) = run.report_path.clone() else {
        return Err(CoreError::NotFound {
            entity: "Report",
            id: run.ctx.id.to_string(),
        }
        .into());
    };
    attachment(&path, "Report").await
}

/// Nothing uploaded yet means there is nothing to download.
fn not_found_unless_known(err: CoreError, entity: &'static str) -> CoreError {
    match err {
        CoreError::Conflict(_) => CoreError::NotFound {
            entity,
            id: "latest".to_string(),
        },
        other => other,
    }
}
