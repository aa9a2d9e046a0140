//! Scratch directory holding the per-run artifacts: persisted ROI crops,
//! classifier inputs, heatmaps and bar charts. Everything in it is transient
//! and is wiped before each display/process cycle.

use std::fs;
use std::path::{Path, PathBuf};

use image::GrayImage;
use tracing::{debug, warn};

use crate::error::{Result, ReviewError};
use crate::imaging::RoiCrops;

/// Where the crops of the current run were written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropPaths {
    pub lateral: PathBuf,
    pub medial: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    /// Opens (creating if needed) the scratch directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Deletes every file in the scratch directory and returns how many went.
    /// An empty or missing directory is not an error.
    pub fn clear(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(ReviewError::CleanupFailed {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry
                .map_err(|source| ReviewError::CleanupFailed {
                    path: self.root.clone(),
                    source,
                })?
                .path();
            if !path.is_file() {
                continue;
            }
            fs::remove_file(&path).map_err(|source| ReviewError::CleanupFailed {
                path: path.clone(),
                source,
            })?;
            removed += 1;
        }

        debug!(dir = %self.root.display(), removed, "cleared scratch directory");
        Ok(removed)
    }

    /// [`ScratchDir::clear`] for callers that only want a log line on failure.
    pub fn clear_or_log(&self) {
        if let Err(err) = self.clear() {
            warn!(error = %err, "scratch cleanup failed");
        }
    }

    /// Saves both crops named after the source file, e.g.
    /// `knee01_lateral.png` for `knee01.dcm`.
    pub fn persist_crops(&self, source_name: &str, crops: &RoiCrops) -> Result<CropPaths> {
        let stem = Path::new(source_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "roi".to_string());

        let paths = CropPaths {
            lateral: self.artifact_path(&format!("{stem}_lateral.png")),
            medial: self.artifact_path(&format!("{stem}_medial.png")),
        };
        save_gray(&crops.lateral, &paths.lateral)?;
        save_gray(&crops.medial, &paths.medial)?;
        Ok(paths)
    }
}

fn save_gray(image: &GrayImage, path: &Path) -> Result<()> {
    image.save(path)?;
    debug!(path = %path.display(), "wrote crop");
    Ok(())
}
