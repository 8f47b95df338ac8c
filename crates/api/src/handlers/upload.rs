//! Video upload: stores the file in a new run and extracts its frames.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use tokio::io::AsyncWriteExt;
use vidtally_core::naming::sanitize_filename;
use vidtally_core::run::RunStage;
use vidtally_pipeline::detect::detect_frames_blocking;
use vidtally_pipeline::extract::extract_frames;

use crate::error::{AppError, AppResult};
use crate::handlers::{report_date, run_detached};
use crate::html;
use crate::runs::RunRecord;
use crate::state::AppState;

/// Multipart field that carries the video.
pub const VIDEO_FIELD: &str = "video";

pub const NO_FILE_PART: &str = "No file part";
pub const NO_SELECTED_FILE: &str = "No selected file";

/// POST /upload
///
/// Expects a file part named `video`. Nothing is written to disk until a
/// file part with a non-empty filename has been found.
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Html<String>> {
    let Ok(mut multipart) = multipart else {
        return Err(AppError::BadRequest(NO_FILE_PART.to_string()));
    };

    let limit = state.config.max_upload_bytes;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        // A part without a filename is a form value, not a file.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if file_name.is_empty() {
            return Err(AppError::BadRequest(NO_SELECTED_FILE.to_string()));
        }
        return store_and_extract(&state, field, &file_name).await.map(Html);
    }

    Err(AppError::BadRequest(NO_FILE_PART.to_string()))
}

async fn store_and_extract(
    state: &AppState,
    field: Field<'_>,
    file_name: &str,
) -> AppResult<String> {
    let video_name = sanitize_filename(file_name);
    let (run_id, mut run) = state.runs.create(&video_name).await;

    let bytes = match write_upload(&run, field, state.config.max_upload_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Err(cleanup) = run.ctx.remove().await {
                tracing::warn!(run_id = %run_id, error = %cleanup, "Failed to remove run directory");
            }
            state.runs.forget(run_id).await;
            return Err(e);
        }
    };
    tracing::info!(run_id = %run_id, video = %video_name, bytes, "Stored upload");

    let settings = state.settings.clone();
    let detector = state.detector.clone();
    let font = state.font.clone();
    let auto_process = state.config.auto_process;
    let (extraction, detection) = run_detached(async move {
        let extraction = extract_frames(&settings, &run.ctx, &run.video_path()).await?;
        run.stage = RunStage::FramesReady;

        let detection = if auto_process {
            let summary =
                detect_frames_blocking(detector, font, run.ctx.clone(), report_date()).await?;
            run.stage = RunStage::DetectionsReady;
            run.report_path = Some(summary.report_path.clone());
            Some(summary)
        } else {
            None
        };
        Ok::<_, AppError>((extraction, detection))
    })
    .await?;

    Ok(html::results_page(
        run_id,
        Some(&extraction),
        detection.as_ref(),
    ))
}

/// Stream the file part into the run's upload directory.
async fn write_upload(run: &RunRecord, mut field: Field<'_>, limit: usize) -> AppResult<u64> {
    run.ctx
        .create_dirs()
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create run directory: {e}")))?;

    let path = run.video_path();
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let mut written = 0u64;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(written)
}

/// Going over the body limit is a 413; any other multipart error is the
/// client's malformed request.
fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("Upload exceeds the {limit} byte limit"))
    } else {
        AppError::BadRequest(err.body_text())
    }
}
