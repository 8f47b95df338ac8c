//! Frame file naming and ordering.
//!
//! Frames are written by ffmpeg as `frame_0001.jpg`, `frame_0002.jpg`, ...
//! Directory listings are not ordered, and lexical order breaks once the
//! sequence outgrows the zero padding (`frame_10000.jpg` sorts before
//! `frame_9999.jpg`), so every consumer goes through [`list_frames`] which
//! sorts by the parsed sequence number.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Filename prefix shared by raw and annotated frames.
pub const FRAME_PREFIX: &str = "frame_";

/// Extension of every frame image.
pub const FRAME_EXTENSION: &str = "jpg";

/// ffmpeg image-sequence pattern matching [`frame_file_name`].
pub const FRAME_PATTERN: &str = "frame_%04d.jpg";

/// A frame image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFile {
    /// 1-based sequence number parsed from the filename, if it follows the
    /// `frame_NNNN.jpg` convention.
    pub index: Option<u32>,
    /// Bare filename, used as the frame identifier in the tally report.
    pub name: String,
    pub path: PathBuf,
}

static FRAME_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^frame_(\d+)\.jpg$").expect("valid regex"));

/// Filename for the frame with the given 1-based sequence number.
///
/// ```
/// use vidtally_core::frames::frame_file_name;
///
/// assert_eq!(frame_file_name(1), "frame_0001.jpg");
/// assert_eq!(frame_file_name(12345), "frame_12345.jpg");
/// ```
pub fn frame_file_name(index: u32) -> String {
    format!("{FRAME_PREFIX}{index:04}.{FRAME_EXTENSION}")
}

/// Parse the sequence number out of a frame filename.
pub fn parse_frame_index(name: &str) -> Option<u32> {
    FRAME_NAME_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

/// Whether a path has the frame image extension (case-insensitive).
fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(FRAME_EXTENSION))
}

fn frame_from_path(path: PathBuf) -> Option<FrameFile> {
    if !has_frame_extension(&path) {
        return None;
    }
    let name = path.file_name()?.to_str()?.to_string();
    Some(FrameFile {
        index: parse_frame_index(&name),
        name,
        path,
    })
}

/// Sort frames by sequence number. Files that do not follow the naming
/// convention go last, ordered by filename.
pub fn sort_frames(frames: &mut [FrameFile]) {
    frames.sort_by(|a, b| {
        (a.index.is_none(), a.index, &a.name).cmp(&(b.index.is_none(), b.index, &b.name))
    });
}

/// List the frame images directly inside `dir` (non-recursive), in
/// sequence order.
pub fn list_frames(dir: &Path) -> std::io::Result<Vec<FrameFile>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(frame) = frame_from_path(entry.path()) {
            frames.push(frame);
        }
    }
    sort_frames(&mut frames);
    Ok(frames)
}

/// Async variant of [`list_frames`] for use inside request handlers.
pub async fn list_frames_async(dir: &Path) -> std::io::Result<Vec<FrameFile>> {
    let mut frames = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(frame) = frame_from_path(entry.path()) {
            frames.push(frame);
        }
    }
    sort_frames(&mut frames);
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn frame_file_name_is_zero_padded() {
        assert_eq!(frame_file_name(7), "frame_0007.jpg");
        assert_eq!(frame_file_name(9999), "frame_9999.jpg");
    }

    #[test]
    fn parse_frame_index_accepts_any_digit_width() {
        assert_eq!(parse_frame_index("frame_0001.jpg"), Some(1));
        assert_eq!(parse_frame_index("frame_10000.jpg"), Some(10000));
        assert_eq!(parse_frame_index("frame_.jpg"), None);
        assert_eq!(parse_frame_index("thumb_0001.jpg"), None);
        assert_eq!(parse_frame_index("frame_0001.png"), None);
    }

    #[test]
    fn list_frames_sorts_numerically() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "frame_10000.jpg");
        touch(dir.path(), "frame_9999.jpg");
        touch(dir.path(), "frame_0002.jpg");
        touch(dir.path(), "frame_0001.jpg");

        let names: Vec<_> = list_frames(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(
            names,
            ["frame_0001.jpg", "frame_0002.jpg", "frame_9999.jpg", "frame_10000.jpg"]
        );
    }

    #[test]
    fn list_frames_filters_extension_and_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "frame_0001.jpg");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "frame_0002.png");
        std::fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let frames = list_frames(dir.path()).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].index, Some(1));
    }

    #[test]
    fn unconventional_names_sort_last() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "zzz.jpg");
        touch(dir.path(), "frame_0003.jpg");
        touch(dir.path(), "aaa.JPG");

        let names: Vec<_> = list_frames(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["frame_0003.jpg", "aaa.JPG", "zzz.jpg"]);
    }

    #[tokio::test]
    async fn async_listing_matches_sync_listing() {
        let dir = tempfile::tempdir().unwrap();
        for i in [3, 1, 2] {
            touch(dir.path(), &frame_file_name(i));
        }
        let sync = list_frames(dir.path()).unwrap();
        let r#async = list_frames_async(dir.path()).await.unwrap();
        assert_eq!(sync, r#async);
    }
}
