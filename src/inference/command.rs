use std::path::PathBuf;
use std::process::Command;

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{KneeClassifier, Prediction};
use crate::error::{Result, ReviewError};

/// How to launch the external model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierCommand {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Runs the model as a child process.
///
/// The crops are written as PNGs into `staging_dir` and their paths are
/// appended to the configured arguments (lateral first). The process must
/// print a JSON [`Prediction`] on stdout and exit successfully.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    command: ClassifierCommand,
    staging_dir: PathBuf,
}

impl CommandClassifier {
    pub fn new(command: ClassifierCommand, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            staging_dir: staging_dir.into(),
        }
    }
}

impl KneeClassifier for CommandClassifier {
    fn infer(&self, lateral: &GrayImage, medial: &GrayImage) -> Result<Prediction> {
        std::fs::create_dir_all(&self.staging_dir)?;
        let lateral_path = self.staging_dir.join("model_input_lateral.png");
        let medial_path = self.staging_dir.join("model_input_medial.png");
        lateral.save(&lateral_path)?;
        medial.save(&medial_path)?;

        debug!(program = %self.command.program.display(), "invoking classifier");
        let output = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(&lateral_path)
            .arg(&medial_path)
            .output()
            .map_err(|err| {
                ReviewError::Inference(format!("failed to start {}: {err}", self.command.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReviewError::Inference(format!(
                "classifier exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let prediction: Prediction = serde_json::from_slice(&output.stdout)
            .map_err(|err| ReviewError::Inference(format!("unreadable classifier output: {err}")))?;
        prediction.validate()?;
        info!(ids = ?prediction.ids(), "classifier finished");
        Ok(prediction)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> ClassifierCommand {
        ClassifierCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), script.into(), "classifier".into()],
        }
    }

    #[test]
    fn reads_prediction_from_stdout() {
        let dir = tempfile::tempdir().unwrap();
        // $1 and $2 are the staged crop paths.
        let classifier = CommandClassifier::new(
            shell(r#"test -f "$1" && test -f "$2" && echo '{"assessments":[{"id":"R","probabilities":[0.1,0.9]}]}'"#),
            dir.path(),
        );
        let crop = GrayImage::new(8, 8);
        let prediction = classifier.infer(&crop, &crop).unwrap();
        assert_eq!(prediction.ids(), vec!["R"]);
        assert!(dir.path().join("model_input_lateral.png").is_file());
    }

    #[test]
    fn failing_process_is_an_inference_error() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = CommandClassifier::new(shell("echo boom >&2; exit 3"), dir.path());
        let crop = GrayImage::new(2, 2);
        let err = classifier.infer(&crop, &crop).unwrap_err();
        assert!(matches!(err, ReviewError::Inference(ref msg) if msg.contains("boom")));
    }

    #[test]
    fn garbage_output_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = CommandClassifier::new(shell("echo not-json"), dir.path());
        let crop = GrayImage::new(2, 2);
        assert!(classifier.infer(&crop, &crop).is_err());
    }
}
