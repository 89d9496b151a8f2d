//! Frame annotation
//!
//! Drawing is visualization only; nothing here feeds back into posture state.

use ab_glyph::FontVec;
use camera_capture::VideoFrame;
use detector::Detection;
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use tracing::info;

use crate::{PostureConfig, PostureError, PostureSample};

const EAR_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const NOSE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const ALARM_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
const STROKE: i32 = 3;

/// Draws detections, the angle readout and the alarm marker
pub struct Overlay {
    font: Option<FontVec>,
    ear_classes: Vec<usize>,
    nose_classes: Vec<usize>,
}

impl Overlay {
    pub fn new(config: &PostureConfig) -> Result<Self, PostureError> {
        let font = match &config.font_path {
            Some(path) => {
                info!("Loading overlay font from {}", path);
                let bytes =
                    std::fs::read(path).map_err(|e| PostureError::Font(format!("{}: {}", path, e)))?;
                Some(FontVec::try_from_vec(bytes).map_err(|e| PostureError::Font(e.to_string()))?)
            }
            None => None,
        };

        Ok(Self {
            font,
            ear_classes: config.ear_classes.clone(),
            nose_classes: config.nose_classes.clone(),
        })
    }

    /// Boxes with labels, the ear-nose line and the angle readout
    pub fn annotate(&self, frame: &mut VideoFrame, detections: &[Detection], sample: &PostureSample) {
        frame.with_image(|img| {
            for det in detections {
                let (color, label) = if self.ear_classes.contains(&det.class_id) {
                    (EAR_COLOR, "EAR")
                } else if self.nose_classes.contains(&det.class_id) {
                    (NOSE_COLOR, "NOSE")
                } else {
                    continue;
                };

                let Some(rect) = ScreenRect::clip(img, det) else {
                    continue;
                };
                thick_rect(img, &rect, color);
                self.text(
                    img,
                    color,
                    rect.left,
                    rect.top.saturating_sub(30),
                    &format!("{} {}%", label, (det.confidence * 100.0) as i32),
                );
            }

            if let (Some(ear), Some(nose), Some(angle)) = (sample.ear, sample.nose, sample.angle) {
                let (w, h) = img.dimensions();
                if near_frame(nose.position(), w, h) && near_frame(ear.position(), w, h) {
                    thick_line(img, nose.position(), ear.position(), EAR_COLOR);
                }
                let x = (w as f32 * 0.78) as i32;
                let y = (h as f32 * 0.92) as i32;
                self.text(img, EAR_COLOR, x, y, &format!("Angle :{}", angle as i32));
            }
        });
    }

    /// Alarm marker shown on the frame that triggered the alert
    pub fn mark_alarm(&self, frame: &mut VideoFrame) {
        frame.with_image(|img| {
            let (w, h) = img.dimensions();
            let side = (w.min(h) / 12).max(4);
            let x = (w as f32 * 0.78) as i32;
            let y = (h as f32 * 0.80) as i32;
            draw_filled_rect_mut(img, Rect::at(x, y).of_size(side, side), ALARM_COLOR);
            self.text(img, ALARM_COLOR, x + side as i32 + 8, y, "Heads-Up");
        });
    }

    fn text(&self, img: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
        if let Some(font) = &self.font {
            let scale = (img.height() as f32 / 30.0).max(12.0);
            draw_text_mut(img, color, x, y, scale, font, text);
        }
    }
}

/// A detection box in pixel coordinates, clamped to a margin around the
/// image so edges outside the frame stay outside
struct ScreenRect {
    left: i32,
    top: i32,
    width: u32,
    height: u32,
}

impl ScreenRect {
    /// None when the box lies entirely off-screen
    fn clip(img: &RgbImage, det: &Detection) -> Option<Self> {
        let (w, h) = img.dimensions();
        let margin = (STROKE + 1) as f32;
        let clamp_x = |v: f32| v.clamp(-margin, w as f32 + margin);
        let clamp_y = |v: f32| v.clamp(-margin, h as f32 + margin);

        let left = clamp_x(det.bbox.x);
        let right = clamp_x(det.bbox.x + det.bbox.width);
        let top = clamp_y(det.bbox.y);
        let bottom = clamp_y(det.bbox.y + det.bbox.height);
        if right < 0.0 || bottom < 0.0 || left > w as f32 || top > h as f32 {
            return None;
        }

        Some(Self {
            left: left as i32,
            top: top as i32,
            width: (right - left).max(0.0) as u32,
            height: (bottom - top).max(0.0) as u32,
        })
    }
}

fn thick_rect(img: &mut RgbImage, rect: &ScreenRect, color: Rgb<u8>) {
    for i in 0..STROKE {
        let grow = 2 * i as u32;
        let w = rect.width.saturating_add(grow).max(1);
        let h = rect.height.saturating_add(grow).max(1);
        let r = Rect::at(rect.left.saturating_sub(i), rect.top.saturating_sub(i)).of_size(w, h);
        draw_hollow_rect_mut(img, r, color);
    }
}

/// Within one frame size of the image on every side
fn near_frame(point: (f32, f32), w: u32, h: u32) -> bool {
    let (w, h) = (w as f32, h as f32);
    (-w..=2.0 * w).contains(&point.0) && (-h..=2.0 * h).contains(&point.1)
}

fn thick_line(img: &mut RgbImage, from: (f32, f32), to: (f32, f32), color: Rgb<u8>) {
    for offset in -(STROKE / 2)..=(STROKE / 2) {
        let d = offset as f32;
        draw_line_segment_mut(img, (from.0 + d, from.1), (to.0 + d, to.1), color);
        draw_line_segment_mut(img, (from.0, from.1 + d), (to.0, to.1 + d), color);
    }
}
