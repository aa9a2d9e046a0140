//! Boundary to the external grading model.
//!
//! The model is opaque: it receives the lateral and (mirrored) medial crops and
//! answers with one assessment per result id. One id means a single-sided
//! result, two or more a bilateral one.

pub mod command;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewError};

pub use command::{ClassifierCommand, CommandClassifier};

/// Coarse attention grid over the side-by-side crop pair, row-major, values
/// in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl AttentionMap {
    pub fn validate(&self) -> Result<()> {
        let expected = self.width as usize * self.height as usize;
        if expected == 0 || self.values.len() != expected {
            return Err(ReviewError::Inference(format!(
                "attention map is {}x{} but carries {} values",
                self.width,
                self.height,
                self.values.len()
            )));
        }
        Ok(())
    }

    pub fn at(&self, x: u32, y: u32) -> f32 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.values[(y * self.width + x) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: String,
    /// Probability per KL grade, index = grade.
    pub probabilities: Vec<f32>,
    #[serde(default)]
    pub attention: Option<AttentionMap>,
}

impl Assessment {
    /// Most probable grade.
    pub fn grade(&self) -> Option<usize> {
        self.probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(grade, _)| grade)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub assessments: Vec<Assessment>,
}

impl Prediction {
    pub fn ids(&self) -> Vec<&str> {
        self.assessments.iter().map(|a| a.id.as_str()).collect()
    }

    pub fn is_bilateral(&self) -> bool {
        self.assessments.len() > 1
    }

    /// Rejects answers the result view cannot render.
    pub fn validate(&self) -> Result<()> {
        if self.assessments.is_empty() {
            return Err(ReviewError::Inference("model returned no result ids".into()));
        }
        for assessment in &self.assessments {
            if assessment.probabilities.is_empty() {
                return Err(ReviewError::Inference(format!(
                    "result {} has no grade probabilities",
                    assessment.id
                )));
            }
            if let Some(attention) = &assessment.attention {
                attention.validate()?;
            }
        }
        Ok(())
    }
}

/// Grading model capability.
pub trait KneeClassifier: Send + Sync {
    fn infer(&self, lateral: &GrayImage, medial: &GrayImage) -> Result<Prediction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(id: &str, probabilities: Vec<f32>) -> Assessment {
        Assessment {
            id: id.into(),
            probabilities,
            attention: None,
        }
    }

    #[test]
    fn grade_is_argmax() {
        assert_eq!(assessment("R", vec![0.1, 0.2, 0.6, 0.05, 0.05]).grade(), Some(2));
        assert_eq!(assessment("R", vec![]).grade(), None);
    }

    #[test]
    fn parses_model_answer() {
        let json = r#"{
            "assessments": [
                {"id": "R", "probabilities": [0.7, 0.2, 0.1, 0.0, 0.0]},
                {"id": "L", "probabilities": [0.0, 0.1, 0.1, 0.3, 0.5],
                 "attention": {"width": 2, "height": 1, "values": [0.2, 0.9]}}
            ]
        }"#;
        let prediction: Prediction = serde_json::from_str(json).unwrap();
        prediction.validate().unwrap();
        assert!(prediction.is_bilateral());
        assert_eq!(prediction.ids(), vec!["R", "L"]);
        assert_eq!(prediction.assessments[1].grade(), Some(4));
    }

    #[test]
    fn rejects_empty_and_malformed_answers() {
        let empty = Prediction { assessments: vec![] };
        assert!(empty.validate().is_err());

        let mut bad = assessment("R", vec![1.0]);
        bad.attention = Some(AttentionMap {
            width: 3,
            height: 3,
            values: vec![0.0; 4],
        });
        assert!(Prediction { assessments: vec![bad] }.validate().is_err());
    }
}
