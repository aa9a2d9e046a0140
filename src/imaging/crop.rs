//! Turning ROI squares and joint images into the lateral/medial pair the
//! grading model consumes.

use image::GrayImage;
use image::imageops::{flip_horizontal, replace};

use crate::roi::{RoiBox, RoiPair};

/// Extra columns each half takes past the joint center when splitting a
/// pre-cropped joint image.
const SPLIT_OVERLAP: u32 = 16;

/// Model inputs for one knee. `medial` is already mirrored so both crops
/// present the joint space on the same side.
#[derive(Debug, Clone)]
pub struct RoiCrops {
    pub lateral: GrayImage,
    pub medial: GrayImage,
}

/// Copies the pixels under `roi`. Parts of the box outside the image come out
/// black so the crop always has the box's size.
pub fn crop_box(image: &GrayImage, roi: &RoiBox) -> GrayImage {
    let size = roi.size();
    let mut out = GrayImage::new(size.width, size.height);
    replace(&mut out, image, -(roi.left() as i64), -(roi.top() as i64));
    out
}

pub fn extract_roi_crops(image: &GrayImage, pair: &RoiPair) -> RoiCrops {
    RoiCrops {
        lateral: crop_box(image, &pair.lateral),
        medial: flip_horizontal(&crop_box(image, &pair.medial)),
    }
}

/// Splits a joint-centred image into lateral and (mirrored) medial halves the
/// way the training set was prepared: each half is `width / 2 + 16` wide and
/// as tall, starting a quarter of the height down.
pub fn split_joint(image: &GrayImage) -> RoiCrops {
    let (width, height) = image.dimensions();
    let pad = width / 2 + SPLIT_OVERLAP;
    let top = (height / 4) as i64;

    let mut lateral = GrayImage::new(pad, pad);
    replace(&mut lateral, image, 0, -top);

    let mut medial = GrayImage::new(pad, pad);
    replace(&mut medial, image, pad as i64 - width as i64, -top);

    RoiCrops {
        lateral,
        medial: flip_horizontal(&medial),
    }
}

/// Training file names start with their KL grade digit.
pub fn grade_from_file_name(name: &str) -> Option<u8> {
    name.chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .map(|digit| digit as u8)
}
