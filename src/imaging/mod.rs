pub mod crop;
pub mod dicom;
pub mod preprocess;

pub use crop::{RoiCrops, crop_box, extract_roi_crops, grade_from_file_name, split_joint};
pub use dicom::{LoadedStudy, load_study, read_dicom};
pub use preprocess::preprocess_xray;
