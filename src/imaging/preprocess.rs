use image::GrayImage;
use imageproc::contrast::equalize_histogram;

use super::dicom::RawRadiograph;

/// The fixed display/inference transform applied to every radiograph:
/// min-max stretch to 8 bits, `MONOCHROME1` inversion, then global histogram
/// equalization. Resolution is unchanged so ROI coordinates stay in native
/// pixels.
pub fn preprocess_xray(raw: &RawRadiograph) -> GrayImage {
    let stretched = stretch_to_u8(raw);
    equalize_histogram(&stretched)
}

fn stretch_to_u8(raw: &RawRadiograph) -> GrayImage {
    let (width, height) = raw.pixels.dimensions();
    let (min, max) = raw
        .pixels
        .pixels()
        .fold((u16::MAX, u16::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    let range = max.saturating_sub(min) as f32;
    GrayImage::from_fn(width, height, |x, y| {
        let value = raw.pixels.get_pixel(x, y)[0];
        let scaled = if range > 0.0 {
            ((value - min) as f32 / range * 255.0).round() as u8
        } else {
            0
        };
        image::Luma([if raw.inverted { 255 - scaled } else { scaled }])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::dicom::Gray16Image;

    fn ramp(inverted: bool) -> RawRadiograph {
        let pixels = Gray16Image::from_fn(4, 1, |x, _| image::Luma([1000 + x as u16 * 1000]));
        RawRadiograph { pixels, inverted }
    }

    #[test]
    fn stretch_spans_full_range() {
        let out = stretch_to_u8(&ramp(false));
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn monochrome1_is_inverted() {
        let out = stretch_to_u8(&ramp(true));
        assert_eq!(out.get_pixel(0, 0)[0], 255);
        assert_eq!(out.get_pixel(3, 0)[0], 0);
    }

    #[test]
    fn flat_frame_does_not_divide_by_zero() {
        let pixels = Gray16Image::from_pixel(3, 3, image::Luma([42]));
        let out = preprocess_xray(&RawRadiograph { pixels, inverted: false });
        assert_eq!(out.dimensions(), (3, 3));
    }

    #[test]
    fn preprocessing_keeps_resolution() {
        let out = preprocess_xray(&ramp(false));
        assert_eq!(out.dimensions(), (4, 1));
    }
}
