//! Per-run working storage.
//!
//! Every upload gets its own run directory so that artifacts of different
//! uploads never share paths:
//!
//! ```text
//! <data_dir>/runs/<run-id>/
//!     uploads/            the uploaded video
//!     frames/             frame_NNNN.jpg extracted by ffmpeg
//!     processed_frames/   annotated copies, same filenames
//!     output/             objects_count_<date>.csv, output_video.mp4
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;
use crate::tally::report_file_name;

pub const RUNS_DIR: &str = "runs";
pub const UPLOAD_DIR: &str = "uploads";
pub const FRAMES_DIR: &str = "frames";
pub const ANNOTATED_DIR: &str = "processed_frames";
pub const OUTPUT_DIR: &str = "output";

/// Filename of the assembled video inside the output directory.
pub const OUTPUT_VIDEO_NAME: &str = "output_video.mp4";

/// Identifier of one processing run. UUIDv7, so ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RunId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::Validation(format!("'{s}' is not a valid run id")))
    }
}

/// How far a run has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    /// Directory created, upload not yet decoded.
    Created,
    /// Frames extracted.
    FramesReady,
    /// Detection pass finished; annotated frames and report written.
    DetectionsReady,
    /// Output video assembled.
    VideoReady,
}

impl RunStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStage::Created => "created",
            RunStage::FramesReady => "frames_ready",
            RunStage::DetectionsReady => "detections_ready",
            RunStage::VideoReady => "video_ready",
        }
    }
}

/// Paths of one run's working storage. Passed explicitly to every stage.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub id: RunId,
    pub root: PathBuf,
    pub upload_dir: PathBuf,
    pub frames_dir: PathBuf,
    pub annotated_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl RunContext {
    /// Compute the layout for `id` under `data_dir` without touching disk.
    pub fn new(data_dir: &Path, id: RunId) -> Self {
        let root = data_dir.join(RUNS_DIR).join(id.to_string());
        Self {
            id,
            upload_dir: root.join(UPLOAD_DIR),
            frames_dir: root.join(FRAMES_DIR),
            annotated_dir: root.join(ANNOTATED_DIR),
            output_dir: root.join(OUTPUT_DIR),
            root,
        }
    }

    /// Create the run's directories.
    pub async fn create_dirs(&self) -> std::io::Result<()> {
        for dir in [
            &self.upload_dir,
            &self.frames_dir,
            &self.annotated_dir,
            &self.output_dir,
        ] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    /// Remove the whole run directory.
    pub async fn remove(&self) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Where the uploaded video named `file_name` is stored.
    pub fn upload_path(&self, file_name: &str) -> PathBuf {
        self.upload_dir.join(file_name)
    }

    /// Report path for a detection pass on `date`.
    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.output_dir.join(report_file_name(date))
    }

    /// Path of the assembled output video.
    pub fn video_path(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_VIDEO_NAME)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn layout_is_keyed_by_run_id() {
        let id = RunId::new();
        let ctx = RunContext::new(Path::new("/data"), id);
        let root = PathBuf::from("/data/runs").join(id.to_string());
        assert_eq!(ctx.root, root);
        assert_eq!(ctx.frames_dir, root.join("frames"));
        assert_eq!(ctx.annotated_dir, root.join("processed_frames"));
        assert_eq!(ctx.video_path(), root.join("output/output_video.mp4"));

        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(
            ctx.report_path(date),
            root.join("output/objects_count_2-1-2024.csv")
        );
    }

    #[test]
    fn distinct_runs_do_not_share_paths() {
        let a = RunContext::new(Path::new("data"), RunId::new());
        let b = RunContext::new(Path::new("data"), RunId::new());
        assert_ne!(a.root, b.root);
    }

    #[test]
    fn run_id_round_trips_through_display() {
        let id = RunId::new();
        assert_eq!(id.to_string().parse::<RunId>().unwrap(), id);
        assert_matches!("nope".parse::<RunId>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn stages_are_ordered() {
        assert!(RunStage::Created < RunStage::FramesReady);
        assert!(RunStage::FramesReady < RunStage::DetectionsReady);
        assert!(RunStage::DetectionsReady < RunStage::VideoReady);
        assert_eq!(RunStage::VideoReady.as_str(), "video_ready");
    }

    #[tokio::test]
    async fn create_and_remove_dirs() {
        let data = tempfile::tempdir().unwrap();
        let ctx = RunContext::new(data.path(), RunId::new());
        ctx.create_dirs().await.unwrap();
        assert!(ctx.upload_dir.is_dir());
        assert!(ctx.output_dir.is_dir());

        ctx.remove().await.unwrap();
        assert!(!ctx.root.exists());
        ctx.remove().await.unwrap();
    }
}
