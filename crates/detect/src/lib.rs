//! Object detection over still frames.
//!
//! [`ObjectDetector`] is the seam between the pipeline and a model backend.
//! The production backend runs a YOLO-family ONNX export through tract;
//! [`backends::stub::StubDetector`] replays scripted results for tests and
//! model-less demos.

pub mod annotate;
pub mod backend;
pub mod backends;
pub mod classes;
pub mod error;
pub mod nms;
pub mod types;

pub use backend::ObjectDetector;
pub use classes::ClassNames;
pub use error::DetectError;
pub use types::{BBox, Detection};
