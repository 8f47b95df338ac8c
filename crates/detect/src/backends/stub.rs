use std::collections::VecDeque;
use std::sync::Mutex;

use image::RgbImage;

use crate::backend::ObjectDetector;
use crate::classes::ClassNames;
use crate::error::DetectError;
use crate::types::Detection;

/// Detector that replays scripted results instead of running a model.
///
/// Each `detect` call pops the next scripted frame result; once the script
/// is exhausted every further call returns the fallback. Frames are fed in
/// sequence order, so a script lines up with `frame_0001`, `frame_0002`, ...
pub struct StubDetector {
    names: ClassNames,
    script: Mutex<VecDeque<Vec<Detection>>>,
    fallback: Vec<Detection>,
}

impl StubDetector {
    /// A detector that never finds anything.
    pub fn empty(names: ClassNames) -> Self {
        Self::scripted(names, Vec::new(), Vec::new())
    }

    /// A detector that returns `detections` for every frame.
    pub fn constant(names: ClassNames, detections: Vec<Detection>) -> Self {
        Self::scripted(names, Vec::new(), detections)
    }

    pub fn scripted(
        names: ClassNames,
        script: Vec<Vec<Detection>>,
        fallback: Vec<Detection>,
    ) -> Self {
        Self {
            names,
            script: Mutex::new(script.into()),
            fallback,
        }
    }
}

impl ObjectDetector for StubDetector {
    fn name(&self) -> &str {
        "stub"
    }

    fn class_names(&self) -> &ClassNames {
        &self.names
    }

    fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>, DetectError> {
        let mut script = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(script.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}
