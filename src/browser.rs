//! Directory listing and the file-list navigation behind the side panel.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, ReviewError};

const DICOM_EXTENSION: &str = "dcm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DicomEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

fn is_dicom_file(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(OsStr::to_str) == Some(DICOM_EXTENSION)
}

/// Lists the `.dcm` files directly inside `dir`, sorted by name.
pub fn list_dicom_files(dir: &Path) -> Result<Vec<DicomEntry>> {
    let unavailable = |source| ReviewError::DirectoryUnavailable {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries: Vec<DicomEntry> = fs::read_dir(dir)
        .map_err(unavailable)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_dicom_file(path))
        .map(|path| DicomEntry {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes: fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0),
            path,
        })
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    info!(dir = %dir.display(), count = entries.len(), "listed DICOM files");
    Ok(entries)
}

/// The browsed directory, an optional name filter and the selected entry.
/// Navigation steps through the filtered view and wraps at both ends.
#[derive(Debug, Clone, Default)]
pub struct FileBrowser {
    dir: Option<PathBuf>,
    entries: Vec<DicomEntry>,
    filter: String,
    selected: Option<usize>,
}

impl FileBrowser {
    /// Replaces the listing with `dir`. On failure the previous listing stays.
    pub fn open(&mut self, dir: &Path) -> Result<usize> {
        let entries = list_dicom_files(dir)?;
        self.dir = Some(dir.to_path_buf());
        self.entries = entries;
        self.filter.clear();
        self.selected = None;
        Ok(self.entries.len())
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn entries(&self) -> &[DicomEntry] {
        &self.entries
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, query: &str) {
        self.filter = query.to_string();
        debug!(filter = query, "file filter changed");
    }

    /// Indices into [`FileBrowser::entries`] matching the filter.
    pub fn visible(&self) -> Vec<usize> {
        let needle = self.filter.to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| needle.is_empty() || entry.name.to_lowercase().contains(&needle))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn select(&mut self, index: usize) -> Option<&DicomEntry> {
        if index >= self.entries.len() {
            return None;
        }
        self.selected = Some(index);
        self.entries.get(index)
    }

    pub fn next(&mut self) -> Option<&DicomEntry> {
        self.step(1)
    }

    pub fn previous(&mut self) -> Option<&DicomEntry> {
        self.step(-1)
    }

    fn step(&mut self, delta: isize) -> Option<&DicomEntry> {
        let visible = self.visible();
        if visible.is_empty() {
            return None;
        }

        let position = self
            .selected
            .and_then(|current| visible.iter().position(|&index| index == current));
        let next = match position {
            Some(pos) => (pos as isize + delta).rem_euclid(visible.len() as isize) as usize,
            None if delta < 0 => visible.len() - 1,
            None => 0,
        };
        self.select(visible[next])
    }
}
