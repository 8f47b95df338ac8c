use std::path::PathBuf;

use vidtally_core::ffmpeg::FfmpegTools;
use vidtally_detect::backends::yolo::{
    YoloConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_SIZE, DEFAULT_IOU_THRESHOLD,
};
use vidtally_pipeline::PipelineSettings;

/// Which detector implementation serves requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorBackend {
    /// YOLO ONNX model run through tract.
    Yolo,
    /// No model; every frame comes back without detections.
    Stub,
}

impl std::str::FromStr for DetectorBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yolo" => Ok(Self::Yolo),
            "stub" => Ok(Self::Stub),
            other => Err(format!("unknown detector backend '{other}'")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Detector settings.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub backend: DetectorBackend,
    pub model_path: PathBuf,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// One class name per line; the built-in COCO names when unset.
    pub class_names_path: Option<PathBuf>,
    /// Font for box captions; boxes are drawn without captions when unset.
    pub label_font_path: Option<PathBuf>,
}

impl DetectorConfig {
    pub fn yolo_config(&self) -> YoloConfig {
        YoloConfig {
            input_size: self.input_size,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds. Stages run inside the request, so
    /// this has to cover a full extraction plus detection pass.
    pub request_timeout_secs: u64,
    /// Root of the per-run working directories.
    pub data_dir: PathBuf,
    pub ffmpeg_bin: PathBuf,
    pub ffprobe_bin: PathBuf,
    /// Frames sampled per second of source video.
    pub sample_fps: f64,
    /// Playback rate of the assembled video.
    pub output_fps: f64,
    /// Run detection immediately after a successful upload.
    pub auto_process: bool,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
    /// Runs kept on disk; older idle runs are deleted on the next upload.
    pub max_runs: usize,
    pub detector: DetectorConfig,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                  |
    /// |------------------------|--------------------------|
    /// | `HOST`                 | `0.0.0.0`                |
    /// | `PORT`                 | `5000`                   |
    /// | `CORS_ORIGINS`         | `http://localhost:5000`  |
    /// | `REQUEST_TIMEOUT_SECS` | `600`                    |
    /// | `DATA_DIR`             | `data`                   |
    /// | `FFMPEG_BIN`           | `ffmpeg`                 |
    /// | `FFPROBE_BIN`          | `ffprobe`                |
    /// | `SAMPLE_FPS`           | `1`                      |
    /// | `OUTPUT_FPS`           | `1`                      |
    /// | `AUTO_PROCESS`         | `true`                   |
    /// | `MAX_UPLOAD_BYTES`     | `536870912`              |
    /// | `MAX_RUNS`             | `4`                      |
    /// | `DETECTOR_BACKEND`     | `yolo`                   |
    /// | `MODEL_PATH`           | `yolo11n.onnx`           |
    /// | `MODEL_INPUT_SIZE`     | `640`                    |
    /// | `CONFIDENCE_THRESHOLD` | `0.25`                   |
    /// | `IOU_THRESHOLD`        | `0.7`                    |
    /// | `CLASS_NAMES_PATH`     | unset                    |
    /// | `LABEL_FONT_PATH`      | unset                    |
    /// | `LOG_FORMAT`           | `text`                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", "5000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_list(&env_or("CORS_ORIGINS", "http://localhost:5000"));

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "600")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let sample_fps: f64 = env_or("SAMPLE_FPS", "1")
            .parse()
            .expect("SAMPLE_FPS must be a number");
        assert!(sample_fps > 0.0, "SAMPLE_FPS must be positive");

        let output_fps: f64 = env_or("OUTPUT_FPS", "1")
            .parse()
            .expect("OUTPUT_FPS must be a number");
        assert!(output_fps > 0.0, "OUTPUT_FPS must be positive");

        let auto_process =
            parse_bool(&env_or("AUTO_PROCESS", "true")).expect("AUTO_PROCESS must be a boolean");

        let max_upload_bytes: usize = env_or("MAX_UPLOAD_BYTES", "536870912")
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let max_runs: usize = env_or("MAX_RUNS", "4")
            .parse()
            .expect("MAX_RUNS must be a valid usize");
        assert!(max_runs > 0, "MAX_RUNS must be at least 1");

        let detector = DetectorConfig {
            backend: env_or("DETECTOR_BACKEND", "yolo")
                .parse()
                .expect("DETECTOR_BACKEND must be 'yolo' or 'stub'"),
            model_path: env_or("MODEL_PATH", "yolo11n.onnx").into(),
            input_size: std::env::var("MODEL_INPUT_SIZE")
                .map(|v| v.parse().expect("MODEL_INPUT_SIZE must be a valid u32"))
                .unwrap_or(DEFAULT_INPUT_SIZE),
            confidence_threshold: std::env::var("CONFIDENCE_THRESHOLD")
                .map(|v| v.parse().expect("CONFIDENCE_THRESHOLD must be a number"))
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            iou_threshold: std::env::var("IOU_THRESHOLD")
                .map(|v| v.parse().expect("IOU_THRESHOLD must be a number"))
                .unwrap_or(DEFAULT_IOU_THRESHOLD),
            class_names_path: std::env::var("CLASS_NAMES_PATH").ok().map(PathBuf::from),
            label_font_path: std::env::var("LABEL_FONT_PATH").ok().map(PathBuf::from),
        };

        let log_format = match env_or("LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            data_dir: env_or("DATA_DIR", "data").into(),
            ffmpeg_bin: env_or("FFMPEG_BIN", "ffmpeg").into(),
            ffprobe_bin: env_or("FFPROBE_BIN", "ffprobe").into(),
            sample_fps,
            output_fps,
            auto_process,
            max_upload_bytes,
            max_runs,
            detector,
            log_format,
        }
    }

    /// Stage settings derived from this config.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            ffmpeg: FfmpegTools {
                ffmpeg: self.ffmpeg_bin.clone(),
                ffprobe: self.ffprobe_bin.clone(),
            },
            sample_fps: self.sample_fps,
            output_fps: self.output_fps,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` in any case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn origin_list_skips_blanks() {
        assert_eq!(
            split_list("http://a, ,http://b,"),
            ["http://a", "http://b"]
        );
    }

    #[test]
    fn backend_names() {
        assert_eq!("YOLO".parse::<DetectorBackend>(), Ok(DetectorBackend::Yolo));
        assert_eq!("stub".parse::<DetectorBackend>(), Ok(DetectorBackend::Stub));
        assert!("opencv".parse::<DetectorBackend>().is_err());
    }
}
