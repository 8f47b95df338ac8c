pub mod health;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the pipeline route tree.
///
/// ```text
/// /                      GET         upload form
/// /upload                GET, POST   store video, extract frames
/// /process               GET, POST   detect, annotate, tally
/// /download              GET         assemble output video
/// /download_video_file   GET         output video attachment
/// /download_report       GET         CSV report attachment
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::pages::index))
        .route(
            "/upload",
            get(handlers::upload::upload_video).post(handlers::upload::upload_video),
        )
        .route(
            "/process",
            get(handlers::process::process_frames).post(handlers::process::process_frames),
        )
        .route("/download", get(handlers::download::download_video))
        .route(
            "/download_video_file",
            get(handlers::download::download_video_file),
        )
        .route("/download_report", get(handlers::download::download_report))
}
