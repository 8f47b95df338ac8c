//! Burning detections into a frame.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::classes::ClassNames;
use crate::error::DetectError;
use crate::types::Detection;

/// Box outline thickness in pixels.
const BOX_THICKNESS: i32 = 2;
/// Caption height in pixels.
const LABEL_SCALE: f32 = 16.0;
const LABEL_PADDING: i32 = 2;
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Per-class colours; class id picks one modulo the length.
const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
    [52, 69, 147],
    [203, 56, 255],
];

/// Font used for box captions.
pub struct LabelFont {
    font: FontVec,
}

impl LabelFont {
    /// Load a TTF/OTF font from disk.
    pub fn from_file(path: &Path) -> Result<Self, DetectError> {
        let bytes = std::fs::read(path)?;
        let font = FontVec::try_from_vec(bytes).map_err(|_| {
            DetectError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{} is not a usable font", path.display()),
            ))
        })?;
        Ok(Self { font })
    }
}

/// Colour assigned to a class.
pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Caption drawn above a box: `label 0.87`.
pub fn caption(names: &ClassNames, detection: &Detection) -> String {
    format!("{} {:.2}", names.name(detection.class_id), detection.confidence)
}

/// Return a copy of `image` with every detection outlined, plus a
/// `label confidence` caption when a font is available.
pub fn annotate(
    image: &RgbImage,
    detections: &[Detection],
    names: &ClassNames,
    font: Option<&LabelFont>,
) -> RgbImage {
    let mut canvas = image.clone();

    for detection in detections {
        let color = class_color(detection.class_id);
        let x = detection.bbox.x1.round() as i32;
        let y = detection.bbox.y1.round() as i32;
        let w = detection.bbox.width().round() as i32;
        let h = detection.bbox.height().round() as i32;

        for t in 0..BOX_THICKNESS {
            let (rw, rh) = (w - 2 * t, h - 2 * t);
            if rw < 1 || rh < 1 {
                break;
            }
            let rect = Rect::at(x + t, y + t).of_size(rw as u32, rh as u32);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }

        if let Some(font) = font {
            draw_caption(&mut canvas, font, &caption(names, detection), x, y, color);
        }
    }

    canvas
}

fn draw_caption(canvas: &mut RgbImage, font: &LabelFont, text: &str, x: i32, y: i32, bg: Rgb<u8>) {
    let scale = PxScale::from(LABEL_SCALE);
    let (tw, th) = text_size(scale, &font.font, text);
    let bg_w = tw as i32 + 2 * LABEL_PADDING;
    let bg_h = th as i32 + 2 * LABEL_PADDING;
    // Above the box when there is room, otherwise inside its top edge.
    let top = if y - bg_h >= 0 { y - bg_h } else { y };

    draw_filled_rect_mut(
        canvas,
        Rect::at(x, top).of_size(bg_w.max(1) as u32, bg_h.max(1) as u32),
        bg,
    );
    draw_text_mut(
        canvas,
        LABEL_TEXT_COLOR,
        x + LABEL_PADDING,
        top + LABEL_PADDING,
        scale,
        &font.font,
        text,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BBox;

    fn det(class_id: usize, bbox: BBox) -> Detection {
        Detection {
            class_id,
            bbox,
            confidence: 0.5,
        }
    }

    #[test]
    fn outlines_box_without_touching_interior() {
        let image = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        let out = annotate(
            &image,
            &[det(0, BBox::new(10.0, 10.0, 30.0, 30.0))],
            &ClassNames::coco(),
            None,
        );

        assert_eq!(*out.get_pixel(10, 10), class_color(0));
        assert_eq!(*out.get_pixel(11, 20), class_color(0));
        assert_eq!(*out.get_pixel(20, 20), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(5, 5), Rgb([0, 0, 0]));
        // source untouched
        assert_eq!(*image.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_and_offscreen_boxes_do_not_panic() {
        let image = RgbImage::new(20, 20);
        let dets = [
            det(1, BBox::new(5.0, 5.0, 5.0, 5.0)),
            det(2, BBox::new(15.0, 15.0, 60.0, 60.0)),
        ];
        let out = annotate(&image, &dets, &ClassNames::coco(), None);
        assert_eq!(out.dimensions(), (20, 20));
    }

    #[test]
    fn caption_uses_class_name() {
        let d = Detection {
            class_id: 16,
            bbox: BBox::new(0.0, 0.0, 1.0, 1.0),
            confidence: 0.876,
        };
        assert_eq!(caption(&ClassNames::coco(), &d), "dog 0.88");
    }

    #[test]
    fn colors_cycle_per_class() {
        assert_eq!(class_color(0), class_color(PALETTE.len()));
        assert_ne!(class_color(0), class_color(1));
    }

    #[test]
    fn invalid_font_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(LabelFont::from_file(&path).is_err());
    }
}
