use std::fmt;

use vidtally_core::ffmpeg::FfmpegError;

/// Pipeline stage, used to say where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Extract,
    Detect,
    Assemble,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Extract => "frame extraction",
            Stage::Detect => "detection",
            Stage::Assemble => "video assembly",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage failure, carrying the stage and the underlying cause.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Ffmpeg {
        stage: Stage,
        #[source]
        source: FfmpegError,
    },

    #[error("{stage} failed: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} task did not complete: {message}")]
    Aborted { stage: Stage, message: String },
}

impl PipelineError {
    pub fn ffmpeg(stage: Stage, source: FfmpegError) -> Self {
        Self::Ffmpeg { stage, source }
    }

    pub fn io(stage: Stage, source: std::io::Error) -> Self {
        Self::Io { stage, source }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Ffmpeg { stage, .. }
            | PipelineError::Io { stage, .. }
            | PipelineError::Aborted { stage, .. } => *stage,
        }
    }
}
