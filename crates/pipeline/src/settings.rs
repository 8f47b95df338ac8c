use vidtally_core::ffmpeg::FfmpegTools;

/// Default sampling rate when extracting frames.
pub const DEFAULT_SAMPLE_FPS: f64 = 1.0;
/// Default playback rate of the assembled video.
pub const DEFAULT_OUTPUT_FPS: f64 = 1.0;

/// Media settings shared by every run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub ffmpeg: FfmpegTools,
    /// Frames sampled per second of source video.
    pub sample_fps: f64,
    /// Playback rate of the assembled video.
    pub output_fps: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            ffmpeg: FfmpegTools::default(),
            sample_fps: DEFAULT_SAMPLE_FPS,
            output_fps: DEFAULT_OUTPUT_FPS,
        }
    }
}
