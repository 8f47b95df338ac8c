//! YOLO detector backed by an ONNX model run through tract.

use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::backend::ObjectDetector;
use crate::classes::ClassNames;
use crate::error::DetectError;
use crate::nms::non_max_suppression;
use crate::types::{BBox, Detection};

/// Default square input size of YOLOv8/YOLO11 exports.
pub const DEFAULT_INPUT_SIZE: u32 = 640;
/// Minimum best-class score for a proposal to be kept.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
/// IoU above which a same-class box is suppressed.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

/// Settings for [`YoloOnnxDetector`].
#[derive(Debug, Clone)]
pub struct YoloConfig {
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

/// YOLO (v8/11 output layout) ONNX model run through tract.
///
/// The model is loaded and optimized once; [`ObjectDetector::detect`] only
/// borrows it, so one instance serves every request.
pub struct YoloOnnxDetector {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    names: ClassNames,
    config: YoloConfig,
}

impl YoloOnnxDetector {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn load(
        model_path: &Path,
        names: ClassNames,
        config: YoloConfig,
    ) -> Result<Self, DetectError> {
        let load_err = |e| model_load_error(model_path, e);
        let size = config.input_size as usize;

        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(load_err)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .map_err(load_err)?
            .into_optimized()
            .map_err(load_err)?
            .into_runnable()
            .map_err(load_err)?;

        tracing::info!(
            model = %model_path.display(),
            input_size = config.input_size,
            classes = names.len(),
            "Loaded YOLO ONNX model"
        );

        Ok(Self {
            model,
            names,
            config,
        })
    }

    /// Resize to the model input and build an NCHW tensor normalised to [0, 1].
    fn build_input(&self, image: &RgbImage) -> Tensor {
        let size = self.config.input_size;
        let resized = image::imageops::resize(image, size, size, FilterType::Triangle);
        let size = size as usize;
        tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
            resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
        })
        .into_tensor()
    }
}

impl ObjectDetector for YoloOnnxDetector {
    fn name(&self) -> &str {
        "yolo-onnx"
    }

    fn class_names(&self) -> &ClassNames {
        &self.names
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectError> {
        let input = self.build_input(image);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DetectError::Inference(format!("{e:#}")))?;

        let output = outputs
            .first()
            .ok_or_else(|| DetectError::Inference("model produced no outputs".into()))?;
        let data = output
            .as_slice::<f32>()
            .map_err(|e| DetectError::Inference(format!("model output was not f32: {e:#}")))?;

        let size = self.config.input_size as f32;
        let frame = FrameGeometry {
            scale_x: image.width() as f32 / size,
            scale_y: image.height() as f32 / size,
            width: image.width() as f32,
            height: image.height() as f32,
        };
        let candidates =
            decode_output(data, output.shape(), self.config.confidence_threshold, &frame)?;
        Ok(non_max_suppression(candidates, self.config.iou_threshold))
    }
}

fn model_load_error(path: &Path, e: impl std::fmt::Display) -> DetectError {
    DetectError::ModelLoad {
        path: path.display().to_string(),
        message: format!("{e:#}"),
    }
}

/// Mapping from model input space back to the source frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameGeometry {
    pub scale_x: f32,
    pub scale_y: f32,
    pub width: f32,
    pub height: f32,
}

/// Decode a raw YOLO output tensor into candidate detections (pre-NMS).
///
/// Accepts `[1, 4 + C, N]` (the usual export) or its transpose
/// `[1, N, 4 + C]`; each proposal is `cx, cy, w, h` followed by `C` class
/// scores. The layout is told apart by assuming there are more proposals
/// than attributes.
pub fn decode_output(
    data: &[f32],
    shape: &[usize],
    confidence_threshold: f32,
    frame: &FrameGeometry,
) -> Result<Vec<Detection>, DetectError> {
    let (rows, cols) = match shape {
        [1, a, b] | [a, b] => (*a, *b),
        _ => return Err(DetectError::OutputShape(shape.to_vec())),
    };
    if data.len() != rows * cols {
        return Err(DetectError::OutputShape(shape.to_vec()));
    }

    let channels_first = rows <= cols;
    let (attrs, proposals) = if channels_first { (rows, cols) } else { (cols, rows) };
    if attrs <= 4 {
        return Err(DetectError::OutputShape(shape.to_vec()));
    }
    let num_classes = attrs - 4;

    let at = |attr: usize, i: usize| -> f32 {
        if channels_first {
            data[attr * proposals + i]
        } else {
            data[i * attrs + attr]
        }
    };

    let mut detections = Vec::new();
    for i in 0..proposals {
        let (class_id, score) = (0..num_classes)
            .map(|c| (c, at(4 + c, i)))
            .fold((0, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if score < confidence_threshold {
            continue;
        }

        let bbox = BBox::from_center(at(0, i), at(1, i), at(2, i), at(3, i))
            .scale(frame.scale_x, frame.scale_y)
            .clamp(frame.width, frame.height);
        if bbox.area() <= 0.0 {
            continue;
        }

        detections.push(Detection {
            class_id,
            bbox,
            confidence: score,
        });
    }
    Ok(detections)
}
