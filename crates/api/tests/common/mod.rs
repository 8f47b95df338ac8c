#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use tower::ServiceExt;

use vidtally_api::config::{DetectorBackend, DetectorConfig, LogFormat, ServerConfig};
use vidtally_api::router::build_app_router;
use vidtally_api::state::AppState;
use vidtally_core::frames::frame_file_name;
use vidtally_core::run::{RunId, RunStage};
use vidtally_detect::backends::stub::StubDetector;
use vidtally_detect::{ClassNames, DetectError, Detection, ObjectDetector};

pub const BOUNDARY: &str = "vidtally-test-boundary";

/// Build a test `ServerConfig` rooted at `data_dir`.
pub fn test_config(data_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5000".to_string()],
        request_timeout_secs: 60,
        data_dir: data_dir.to_path_buf(),
        ffmpeg_bin: PathBuf::from("ffmpeg"),
        ffprobe_bin: PathBuf::from("ffprobe"),
        sample_fps: 1.0,
        output_fps: 1.0,
        auto_process: true,
        max_upload_bytes: 16 * 1024 * 1024,
        max_runs: 8,
        detector: DetectorConfig {
            backend: DetectorBackend::Stub,
            model_path: PathBuf::from("unused.onnx"),
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            class_names_path: None,
            label_font_path: None,
        },
        log_format: LogFormat::Text,
    }
}

/// State with a stub detector that finds nothing.
pub fn test_state(data_dir: &Path) -> AppState {
    test_state_with(data_dir, Arc::new(StubDetector::empty(ClassNames::coco())))
}

pub fn test_state_with(data_dir: &Path, detector: Arc<dyn ObjectDetector>) -> AppState {
    AppState::new(test_config(data_dir), detector, None)
}

/// State over a hand-tuned config.
pub fn test_state_from(config: ServerConfig, detector: Arc<dyn ObjectDetector>) -> AppState {
    AppState::new(config, detector, None)
}

/// Finds nothing, taking `delay` per frame.
pub struct SlowDetector {
    names: ClassNames,
    delay: Duration,
}

impl SlowDetector {
    pub fn new(delay: Duration) -> Self {
        Self {
            names: ClassNames::coco(),
            delay,
        }
    }
}

impl ObjectDetector for SlowDetector {
    fn name(&self) -> &str {
        "slow"
    }

    fn class_names(&self) -> &ClassNames {
        &self.names
    }

    fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>, DetectError> {
        std::thread::sleep(self.delay);
        Ok(Vec::new())
    }
}

/// The production router over `state`.
pub fn build_test_app(state: AppState) -> Router {
    let config = state.config.as_ref().clone();
    build_app_router(state, &config)
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::post(uri).body(Body::empty()).unwrap()).await
}

/// One part of a multipart body: `(field name, filename, bytes)`.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let request = Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Register a run whose frames are already on disk, skipping upload and
/// extraction.
pub async fn seed_run_with_frames(state: &AppState, frames: u32) -> RunId {
    let (id, mut run) = state.runs.create("seeded.mp4").await;
    run.ctx.create_dirs().await.unwrap();
    for i in 1..=frames {
        RgbImage::from_pixel(64, 48, Rgb([30, 60, 90]))
            .save(run.ctx.frames_dir.join(frame_file_name(i)))
            .unwrap();
    }
    run.stage = RunStage::FramesReady;
    id
}

/// Render a short synthetic clip with ffmpeg and return its bytes.
pub async fn synthetic_clip(dir: &Path, seconds: u32) -> Vec<u8> {
    let path = dir.join("clip.mp4");
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-loglevel", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=duration={seconds}:size=160x120:rate=10"))
        .args(["-pix_fmt", "yuv420p"])
        .arg(&path)
        .status()
        .await
        .unwrap();
    assert!(status.success());
    tokio::fs::read(&path).await.unwrap()
}
