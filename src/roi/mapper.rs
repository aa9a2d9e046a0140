//! Widget-space <-> image-space conversion for a widget that stretches the
//! image over its whole extent.

use super::geometry::{DisplayPoint, ImageGeometry, ImagePoint, WidgetSize};

/// Maps a pointer position onto the image's pixel grid.
///
/// `px = floor(x * iw / W)`, `py = floor(y * ih / H)`. Results are not
/// clamped: a pointer on the widget edge can land on, or just past, the last
/// pixel. Returns `None` when the widget has no extent.
pub fn map_to_image(point: DisplayPoint, widget: WidgetSize, image: ImageGeometry) -> Option<ImagePoint> {
    if widget.is_empty() {
        return None;
    }

    let px = (point.x as i64 * image.width as i64).div_euclid(widget.width as i64);
    let py = (point.y as i64 * image.height as i64).div_euclid(widget.height as i64);

    Some(ImagePoint::new(saturate(px), saturate(py)))
}

/// Inverse of [`map_to_image`] without flooring, used to draw overlays.
pub fn map_to_display(point: ImagePoint, widget: WidgetSize, image: ImageGeometry) -> Option<(f32, f32)> {
    if image.width == 0 || image.height == 0 {
        return None;
    }

    let sx = widget.width as f32 / image.width as f32;
    let sy = widget.height as f32 / image.height as f32;
    Some((point.x as f32 * sx, point.y as f32 * sy))
}

fn saturate(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
