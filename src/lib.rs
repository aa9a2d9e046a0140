//! Knee X-ray review: DICOM browsing, two-box lateral/medial ROI placement and
//! hand-off of the cropped joint regions to an external grading model.

pub mod analysis;
pub mod browser;
pub mod config;
pub mod error;
pub mod gui_app;
pub mod imaging;
pub mod inference;
pub mod logging;
pub mod plot_prediction;
pub mod roi;
pub mod scratch;

pub use error::{Result, ReviewError};
