//! Startup construction of the detector and label font.

use std::sync::Arc;

use vidtally_detect::annotate::LabelFont;
use vidtally_detect::backends::stub::StubDetector;
use vidtally_detect::backends::yolo::YoloOnnxDetector;
use vidtally_detect::{ClassNames, DetectError, ObjectDetector};

use crate::config::{DetectorBackend, DetectorConfig};

/// Build the configured detector. The model is loaded here, once per process.
pub fn load_detector(config: &DetectorConfig) -> Result<Arc<dyn ObjectDetector>, DetectError> {
    let names = match &config.class_names_path {
        Some(path) => ClassNames::from_file(path)?,
        None => ClassNames::coco(),
    };

    let detector: Arc<dyn ObjectDetector> = match config.backend {
        DetectorBackend::Yolo => Arc::new(YoloOnnxDetector::load(
            &config.model_path,
            names,
            config.yolo_config(),
        )?),
        DetectorBackend::Stub => {
            tracing::warn!("Using stub detector; frames will have no detections");
            Arc::new(StubDetector::empty(names))
        }
    };
    Ok(detector)
}

/// Load the caption font, if one is configured.
pub fn load_font(config: &DetectorConfig) -> Result<Option<Arc<LabelFont>>, DetectError> {
    config
        .label_font_path
        .as_deref()
        .map(|path| LabelFont::from_file(path).map(Arc::new))
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use assert_matches::assert_matches;

    use super::*;

    fn config(backend: DetectorBackend) -> DetectorConfig {
        DetectorConfig {
            backend,
            model_path: PathBuf::from("does-not-exist.onnx"),
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            class_names_path: None,
            label_font_path: None,
        }
    }

    #[test]
    fn stub_backend_needs_no_model() {
        let detector = load_detector(&config(DetectorBackend::Stub)).unwrap();
        assert_eq!(detector.name(), "stub");
        assert_eq!(detector.class_names().len(), 80);
    }

    #[test]
    fn missing_model_fails_to_load() {
        let err = load_detector(&config(DetectorBackend::Yolo)).err().unwrap();
        assert_matches!(err, DetectError::ModelLoad { .. });
    }

    #[test]
    fn custom_class_names_are_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.txt");
        std::fs::write(&path, "cat\ndog\n").unwrap();
        let mut cfg = config(DetectorBackend::Stub);
        cfg.class_names_path = Some(path);

        let detector = load_detector(&cfg).unwrap();
        assert_eq!(detector.class_names().name(1), "dog");
    }

    #[test]
    fn no_font_configured() {
        assert!(load_font(&config(DetectorBackend::Stub)).unwrap().is_none());
    }
}
