use garde::Validate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One recognized text fragment returned by the OCR engine.
///
/// `bbox` is the quadrilateral in top-left, top-right, bottom-right,
/// bottom-left order, in pixel coordinates of the image that was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct OcrDetection {
    #[garde(skip)]
    pub bbox: [[f32; 2]; 4],

    #[garde(length(min = 1, max = 128))]
    pub text: String,

    #[garde(range(min = 0.0, max = 1.0))]
    pub confidence: f32,
}

impl OcrDetection {
    /// Same detection with its box moved by `(dx, dy)`.
    pub fn offset(mut self, dx: f32, dy: f32) -> Self {
        for corner in &mut self.bbox {
            corner[0] += dx;
            corner[1] += dy;
        }
        self
    }
}

/// Axis-aligned pixel window inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Grow the window by `margin` on every side, clamped to the frame.
    pub fn expand_within(self, margin: u32, frame_width: u32, frame_height: u32) -> PixelRect {
        let x0 = self.x.saturating_sub(margin);
        let y0 = self.y.saturating_sub(margin);
        let x1 = (self.x + self.width + margin).min(frame_width);
        let y1 = (self.y + self.height + margin).min(frame_height);
        PixelRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Quadrilateral picked by the localizer as the most plate-like region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateRegion {
    pub corners: [(i32, i32); 4],
    /// Enclosed area of the source contour, in pixels.
    pub contour_area: f64,
}

impl PlateRegion {
    /// Bounding box of the quadrilateral, clamped to non-negative coordinates.
    pub fn bounding_rect(&self) -> PixelRect {
        let xs = self.corners.iter().map(|c| c.0.max(0));
        let ys = self.corners.iter().map(|c| c.1.max(0));
        let min_x = xs.clone().min().unwrap_or(0);
        let max_x = xs.max().unwrap_or(0);
        let min_y = ys.clone().min().unwrap_or(0);
        let max_y = ys.max().unwrap_or(0);
        PixelRect {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x) as u32,
            height: (max_y - min_y) as u32,
        }
    }
}

/// Output of one extraction pass over a frame.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Normalized, admitted candidates in detection order.
    pub candidates: Vec<String>,
    /// Annotated audit copy of the frame.
    pub annotated_path: PathBuf,
    /// Saved crop of the localized region, when one was found.
    pub cropped_plate_path: Option<PathBuf>,
    /// False when the whole frame had to be read.
    pub localized: bool,
}
