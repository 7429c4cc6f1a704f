//! Page and field geometry in PDF point space and screen pixel space

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Unsupported page rotation: {0} (expected 0, 90, 180 or 270)")]
    UnsupportedRotation(i64),

    #[error("Invalid page box: width {width} x height {height}")]
    InvalidPageBox { width: f64, height: f64 },
}

/// Page rotation as stored in the PDF `/Rotate` entry (clockwise)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize an angle modulo 360 and map it onto a quarter turn
    pub fn from_degrees(degrees: i64) -> Result<Self, GeometryError> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(GeometryError::UnsupportedRotation(degrees)),
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Whether the page's long and short axes swap on screen
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl TryFrom<i64> for Rotation {
    type Error = GeometryError;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i64 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Visible page box (CropBox, falling back to MediaBox) and rotation of one page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGeometry {
    /// Page number (1-indexed)
    pub page_number: u32,
    pub rotation: Rotation,
    pub box_x: f64,
    pub box_y: f64,
    pub box_width: f64,
    pub box_height: f64,
}

impl PageGeometry {
    pub fn new(
        page_number: u32,
        rotation: Rotation,
        box_x: f64,
        box_y: f64,
        box_width: f64,
        box_height: f64,
    ) -> Result<Self, GeometryError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(box_width) || !positive(box_height) {
            return Err(GeometryError::InvalidPageBox {
                width: box_width,
                height: box_height,
            });
        }

        Ok(Self {
            page_number,
            rotation,
            box_x,
            box_y,
            box_width,
            box_height,
        })
    }

    /// Build from a PDF box array `[x1 y1 x2 y2]` and a raw `/Rotate` value
    pub fn from_pdf_box(
        page_number: u32,
        rotate: i64,
        pdf_box: [f64; 4],
    ) -> Result<Self, GeometryError> {
        let rotation = Rotation::from_degrees(rotate)?;
        let [x1, y1, x2, y2] = pdf_box;
        Self::new(
            page_number,
            rotation,
            x1.min(x2),
            y1.min(y2),
            (x2 - x1).abs(),
            (y2 - y1).abs(),
        )
    }
}

/// Field rectangle in PDF points, bottom-left origin, unrotated page space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FieldRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from a PDF `/Rect` array `[x1 y1 x2 y2]`; corners may be in any order
    pub fn from_corners(rect: [f64; 4]) -> Self {
        let [x1, y1, x2, y2] = rect;
        Self {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }
}

/// Pixel size of a rasterized page as displayed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPreview {
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl RenderedPreview {
    pub fn new(pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            pixel_width,
            pixel_height,
        }
    }

    /// False until the image has been laid out with a non-zero size
    pub fn is_ready(&self) -> bool {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        usable(self.pixel_width) && usable(self.pixel_height)
    }
}

/// Overlay rectangle in CSS pixels, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    /// Sentinel returned while the preview has no size yet
    pub const ZERO: ScreenRect = ScreenRect {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.left + self.width && y >= self.top && y <= self.top + self.height
    }
}
