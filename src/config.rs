//! TOML settings with built-in defaults; command-line flags override them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ReviewError};
use crate::inference::ClassifierCommand;
use crate::logging::LogFormat;
use crate::roi::BoxSize;
use crate::roi::geometry::{DEFAULT_BOX_SIDE, MAX_BOX_SIDE};

const APP_DIR: &str = "knee_xray_reviewer";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Side length of the lateral and medial squares, in image pixels.
    pub box_size: u32,
    /// Where crops, charts and heatmaps are written. Wiped on every run.
    pub scratch_dir: PathBuf,
    /// Directory the folder picker opens in.
    pub browse_start: PathBuf,
    pub classifier: Option<ClassifierCommand>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR);
        let browse_start = dirs::desktop_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            box_size: DEFAULT_BOX_SIDE,
            scratch_dir: data_dir.join("analyzed"),
            browse_start,
            classifier: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            window_width: 1280.0,
            window_height: 800.0,
        }
    }
}

impl Settings {
    /// Per-user config file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Loads `path` if given (it must exist), otherwise the per-user file when
    /// present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| ReviewError::Config(format!("cannot read {}: {err}", path.display())))?;
        debug!(path = %path.display(), "read settings");
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| ReviewError::Config(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.box_size == 0 {
            return Err(ReviewError::Config("box_size must be positive".into()));
        }
        if self.box_size > MAX_BOX_SIDE {
            return Err(ReviewError::Config(format!(
                "box_size {} exceeds the limit of {MAX_BOX_SIDE}",
                self.box_size
            )));
        }
        if let Some(classifier) = &self.classifier
            && classifier.program.as_os_str().is_empty()
        {
            return Err(ReviewError::Config("classifier.program is empty".into()));
        }
        Ok(())
    }

    pub fn roi_box_size(&self) -> BoxSize {
        BoxSize::square(self.box_size)
    }
}
