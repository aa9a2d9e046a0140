use std::path::{Path, PathBuf};

use dicom_dictionary_std::tags;
use dicom_object::open_file;
use dicom_pixeldata::PixelDecoder;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use tracing::{debug, info};

use super::preprocess::preprocess_xray;
use crate::error::{Result, ReviewError};
use crate::roi::ImageGeometry;

pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Decoded radiograph before preprocessing.
#[derive(Debug, Clone)]
pub struct RawRadiograph {
    pub pixels: Gray16Image,
    /// `MONOCHROME1` stores bright as low values and needs inverting.
    pub inverted: bool,
}

/// A DICOM file after loading and the fixed preprocessing step, at native
/// resolution.
#[derive(Debug, Clone)]
pub struct LoadedStudy {
    pub path: PathBuf,
    pub image: GrayImage,
}

impl LoadedStudy {
    pub fn geometry(&self) -> ImageGeometry {
        ImageGeometry::new(self.image.width(), self.image.height())
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// RGBA bytes for display widgets.
    pub fn display_rgba(&self) -> Vec<u8> {
        DynamicImage::ImageLuma8(self.image.clone()).to_rgba8().into_raw()
    }
}

/// Decodes the first frame of a DICOM file into 16-bit grayscale.
pub fn read_dicom(path: &Path) -> Result<RawRadiograph> {
    let object = open_file(path).map_err(|err| ReviewError::Dicom(format!("{}: {err}", path.display())))?;

    let photometric = object
        .element(tags::PHOTOMETRIC_INTERPRETATION)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| value.trim().to_string());

    let decoded = object
        .decode_pixel_data()
        .map_err(|err| ReviewError::Dicom(format!("failed to decode pixel data: {err}")))?;
    let frame = decoded
        .to_dynamic_image(0)
        .map_err(|err| ReviewError::Dicom(format!("failed to convert frame: {err}")))?;

    let pixels = frame.to_luma16();
    debug!(
        path = %path.display(),
        width = pixels.width(),
        height = pixels.height(),
        photometric = photometric.as_deref().unwrap_or("unknown"),
        "decoded DICOM frame"
    );

    Ok(RawRadiograph {
        pixels,
        inverted: photometric.as_deref() == Some("MONOCHROME1"),
    })
}

pub fn load_study(path: &Path) -> Result<LoadedStudy> {
    let raw = read_dicom(path)?;
    let image = preprocess_xray(&raw);
    info!(path = %path.display(), width = image.width(), height = image.height(), "loaded study");
    Ok(LoadedStudy {
        path: path.to_path_buf(),
        image,
    })
}
