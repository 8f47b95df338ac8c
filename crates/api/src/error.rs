use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use vidtally_core::error::CoreError;
use vidtally_pipeline::PipelineError;

use crate::html;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for run-state errors and [`PipelineError`] for stage
/// failures. Bad requests answer in plain text; everything else renders an
/// HTML page.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `vidtally_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A pipeline stage failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request body went over the configured upload limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title, detail) = match &self {
            AppError::BadRequest(msg) => {
                return (StatusCode::BAD_REQUEST, msg.clone()).into_response();
            }

            AppError::PayloadTooLarge(msg) => {
                return (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()).into_response();
            }

            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    return (StatusCode::BAD_REQUEST, msg.clone()).into_response();
                }
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "Not found",
                    format!("{entity} {id} not found"),
                ),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "Not ready", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal error",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::Pipeline(err) => {
                tracing::error!(stage = %err.stage(), error = %err, "Pipeline stage failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Processing failed",
                    err.to_string(),
                )
            }

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Html(html::error_page(title, &detail))).into_response()
    }
}
