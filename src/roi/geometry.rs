use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Default side length of both ROI squares, in image pixels.
pub const DEFAULT_BOX_SIDE: u32 = 495;
/// Largest accepted ROI side; a crop allocates `side * side` bytes.
pub const MAX_BOX_SIDE: u32 = 16_384;

/// Pointer position in widget space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayPoint {
    pub x: i32,
    pub y: i32,
}

impl DisplayPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Truncates a sub-pixel widget position onto the integer grid.
    pub fn from_f32(x: f32, y: f32) -> Self {
        Self {
            x: x.floor() as i32,
            y: y.floor() as i32,
        }
    }
}

/// Position in native image-pixel space. May lie outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImagePoint {
    pub x: i32,
    pub y: i32,
}

impl ImagePoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Sub for ImagePoint {
    type Output = Offset;

    fn sub(self, rhs: ImagePoint) -> Offset {
        Offset {
            dx: self.x - rhs.x,
            dy: self.y - rhs.y,
        }
    }
}

impl Sub<Offset> for ImagePoint {
    type Output = ImagePoint;

    fn sub(self, rhs: Offset) -> ImagePoint {
        ImagePoint::new(self.x - rhs.dx, self.y - rhs.dy)
    }
}

impl Add<Offset> for ImagePoint {
    type Output = ImagePoint;

    fn add(self, rhs: Offset) -> ImagePoint {
        ImagePoint::new(self.x + rhs.dx, self.y + rhs.dy)
    }
}

/// Current extent of the display widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WidgetSize {
    pub width: u32,
    pub height: u32,
}

impl WidgetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn from_f32(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0).floor() as u32,
            height: height.max(0.0).floor() as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Native resolution of the loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageGeometry {
    pub width: u32,
    pub height: u32,
}

impl ImageGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Default top-left corners of the lateral and medial squares.
    ///
    /// The image is split at its horizontal center; each square starts a third
    /// of the half-width into its half, a quarter of the height down.
    pub fn default_placement(&self) -> (ImagePoint, ImagePoint) {
        let center = self.width / 2;
        let right_x = (self.width - center) / 3;
        let left_x = right_x + center;
        let top_y = self.height / 4;
        (
            ImagePoint::new(right_x as i32, top_y as i32),
            ImagePoint::new(left_x as i32, top_y as i32),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: u32,
    pub height: u32,
}

impl BoxSize {
    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    /// Signed extent for image-space arithmetic, saturating at `i32::MAX`.
    pub fn extent(&self) -> Offset {
        Offset {
            dx: i32::try_from(self.width).unwrap_or(i32::MAX),
            dy: i32::try_from(self.height).unwrap_or(i32::MAX),
        }
    }
}

impl Default for BoxSize {
    fn default() -> Self {
        Self::square(DEFAULT_BOX_SIDE)
    }
}

/// Axis-aligned ROI square. The size is fixed at creation; drags only move
/// the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiBox {
    top_left: ImagePoint,
    size: BoxSize,
}

impl RoiBox {
    pub fn new(top_left: ImagePoint, size: BoxSize) -> Self {
        Self { top_left, size }
    }

    pub fn top_left(&self) -> ImagePoint {
        self.top_left
    }

    pub fn size(&self) -> BoxSize {
        self.size
    }

    pub fn left(&self) -> i32 {
        self.top_left.x
    }

    pub fn top(&self) -> i32 {
        self.top_left.y
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.top_left.x.saturating_add(self.size.extent().dx)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.top_left.y.saturating_add(self.size.extent().dy)
    }

    /// Half-open containment: `[left, right) x [top, bottom)`.
    pub fn contains(&self, point: ImagePoint) -> bool {
        point.x >= self.left() && point.x < self.right() && point.y >= self.top() && point.y < self.bottom()
    }

    pub fn move_top_left(&mut self, top_left: ImagePoint) {
        self.top_left = top_left;
    }
}

/// Both squares, as handed to cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiPair {
    pub lateral: RoiBox,
    pub medial: RoiBox,
}
