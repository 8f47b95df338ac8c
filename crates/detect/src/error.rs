/// Errors raised while loading a model or running inference.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("failed to load model {path}: {message}")]
    ModelLoad { path: String, message: String },

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unexpected model output shape {0:?}")]
    OutputShape(Vec<usize>),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
