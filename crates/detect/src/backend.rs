use image::RgbImage;

use crate::classes::ClassNames;
use crate::error::DetectError;
use crate::types::Detection;

/// A loaded detection model.
///
/// Loaded once per process and shared across requests, so implementations
/// must be usable through `&self` from several threads.
pub trait ObjectDetector: Send + Sync {
    /// Backend identifier, shown on the health endpoint.
    fn name(&self) -> &str;

    /// Class-name lookup for the ids this model emits.
    fn class_names(&self) -> &ClassNames;

    /// Run inference on one frame. Boxes are in the frame's pixel space.
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectError>;
}
