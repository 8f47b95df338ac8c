//! /process, /download, /download_video_file and /download_report.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{body_string, get, post_empty};
use vidtally_core::run::{RunId, RunStage};
use vidtally_detect::backends::stub::StubDetector;
use vidtally_detect::{BBox, ClassNames, Detection};

fn person(x1: f32) -> Detection {
    Detection {
        class_id: 0,
        bbox: BBox::new(x1, 4.0, x1 + 10.0, 30.0),
        confidence: 0.91,
    }
}

#[tokio::test]
async fn process_before_upload_is_409() {
    let data = tempfile::tempdir().unwrap();
    let app = common::build_test_app(common::test_state(data.path()));

    let response = get(app, "/process").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_string(response)
        .await
        .contains("no frames have been extracted yet"));
}

#[tokio::test]
async fn process_before_extraction_is_409() {
    let data = tempfile::tempdir().unwrap();
    let state = common::test_state(data.path());
    let (id, _) = state.runs.create("pending.mp4").await;
    let app = common::build_test_app(state);

    let response = post_empty(app, &format!("/process?run={id}")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn download_before_detection_is_409() {
    let data = tempfile::tempdir().unwrap();
    let state = common::test_state(data.path());
    common::seed_run_with_frames(&state, 2).await;
    let app = common::build_test_app(state);

    let response = get(app, "/download").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn video_file_before_assembly_is_404() {
    let data = tempfile::tempdir().unwrap();
    let state = common::test_state(data.path());
    let app = common::build_test_app(state.clone());

    let response = get(app.clone(), "/download_video_file").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    common::seed_run_with_frames(&state, 2).await;
    let response = get(app.clone(), "/process").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app, "/download_video_file").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_run_is_404_and_malformed_run_is_400() {
    let data = tempfile::tempdir().unwrap();
    let state = common::test_state(data.path());
    common::seed_run_with_frames(&state, 1).await;
    let app = common::build_test_app(state);

    let response = get(app.clone(), &format!("/process?run={}", RunId::new())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(app, "/process?run=not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn process_writes_report_and_lists_frames() {
    let data = tempfile::tempdir().unwrap();
    let detector = StubDetector::scripted(
        ClassNames::coco(),
        vec![vec![person(0.0), person(20.0)], vec![], vec![person(5.0)]],
        Vec::new(),
    );
    let state = common::test_state_with(data.path(), Arc::new(detector));
    let id = common::seed_run_with_frames(&state, 3).await;
    let app = common::build_test_app(state.clone());

    let response = post_empty(app.clone(), &format!("/process?run={id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_string(response).await;
    for i in 1..=3 {
        assert!(page.contains(&format!("frame_000{i}.jpg")));
    }
    assert!(page.contains("<td>person</td><td>3</td>"));

    let (_, handle) = state.runs.resolve(Some(id)).await.unwrap();
    assert_eq!(handle.lock().await.stage, RunStage::DetectionsReady);

    let response = get(app, &format!("/download_report?run={id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"objects_count_"));
    assert_eq!(
        body_string(response).await,
        "Frame,Object,Count\nframe_0001.jpg,person,2\nframe_0003.jpg,person,1\n"
    );
}

#[tokio::test]
async fn report_before_detection_is_404() {
    let data = tempfile::tempdir().unwrap();
    let state = common::test_state(data.path());
    common::seed_run_with_frames(&state, 1).await;
    let app = common::build_test_app(state);

    let response = get(app, "/download_report").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assembly_failure_is_reported_as_500() {
    let data = tempfile::tempdir().unwrap();
    let state = common::test_state(data.path());
    let id = common::seed_run_with_frames(&state, 2).await;
    let app = common::build_test_app(state.clone());
    assert_eq!(get(app.clone(), "/process").await.status(), StatusCode::OK);

    // Remove the annotated frames so the encoder has nothing to read.
    {
        let (_, handle) = state.runs.resolve(Some(id)).await.unwrap();
        let run = handle.lock().await;
        std::fs::remove_dir_all(&run.ctx.annotated_dir).unwrap();
    }

    let response = get(app, "/download").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("video assembly failed"));
}

#[tokio::test]
async fn timed_out_detection_finishes_under_the_run_lock() {
    let data = tempfile::tempdir().unwrap();
    let mut config = common::test_config(data.path());
    config.request_timeout_secs = 1;
    let detector = common::SlowDetector::new(Duration::from_millis(400));
    let state = common::test_state_from(config, Arc::new(detector));
    let id = common::seed_run_with_frames(&state, 4).await;
    let app = common::build_test_app(state.clone());

    let response = get(app, &format!("/process?run={id}")).await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    let (_, handle) = state.runs.resolve(Some(id)).await.unwrap();
    assert!(
        handle.try_lock().is_err(),
        "run must stay locked while detection is still writing"
    );

    let run = handle.lock().await;
    assert_eq!(run.stage, RunStage::DetectionsReady);
    assert!(run.report_path.is_some());
    assert_eq!(
        std::fs::read_dir(&run.ctx.annotated_dir).unwrap().count(),
        4
    );
}

#[tokio::test]
async fn runs_beyond_retention_limit_are_gone() {
    let data = tempfile::tempdir().unwrap();
    let mut config = common::test_config(data.path());
    config.max_runs = 1;
    let state = common::test_state_from(
        config,
        Arc::new(StubDetector::empty(ClassNames::coco())),
    );
    let first = common::seed_run_with_frames(&state, 1).await;
    let second = common::seed_run_with_frames(&state, 1).await;
    let app = common::build_test_app(state);

    let response = get(app.clone(), &format!("/process?run={first}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = get(app, &format!("/process?run={second}")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires ffmpeg on PATH"]
async fn assembled_video_is_downloadable() {
    let data = tempfile::tempdir().unwrap();
    let detector = StubDetector::constant(ClassNames::coco(), vec![person(8.0)]);
    let state = common::test_state_with(data.path(), Arc::new(detector));
    let id = common::seed_run_with_frames(&state, 3).await;
    let app = common::build_test_app(state);

    assert_eq!(get(app.clone(), "/process").await.status(), StatusCode::OK);

    let response = get(app.clone(), "/download").await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_string(response).await;
    assert!(page.contains("output_video.mp4"));
    assert!(page.contains(&format!("/download_video_file?run={id}")));

    let response = get(app, "/download_video_file").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "video/mp4");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"output_video.mp4\""
    );
    assert!(!common::body_bytes(response).await.is_empty());
}
