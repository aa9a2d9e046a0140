//! The "process" action once crops are in hand: persist, infer, render.

use std::path::PathBuf;

use tracing::{info, info_span, warn};

use crate::error::{Result, ReviewError};
use crate::imaging::RoiCrops;
use crate::inference::{Assessment, KneeClassifier, Prediction};
use crate::plot_prediction::{render_bar_chart, render_heatmap};
use crate::scratch::{CropPaths, ScratchDir};

/// Rendered outputs for one result id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSlot<T> {
    pub id: String,
    pub grade: Option<usize>,
    pub heatmap: T,
    pub bar_chart: T,
}

impl<T> ResultSlot<T> {
    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> std::result::Result<U, E>) -> std::result::Result<ResultSlot<U>, E> {
        Ok(ResultSlot {
            id: self.id,
            grade: self.grade,
            heatmap: f(self.heatmap)?,
            bar_chart: f(self.bar_chart)?,
        })
    }
}

/// Which result panel gets populated. The first result id fills the right
/// slots of a bilateral view, the second the left ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultView<T> {
    Single(ResultSlot<T>),
    Bilateral { right: ResultSlot<T>, left: ResultSlot<T> },
}

impl<T> ResultView<T> {
    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> std::result::Result<U, E>) -> std::result::Result<ResultView<U>, E> {
        Ok(match self {
            ResultView::Single(slot) => ResultView::Single(slot.try_map(&mut f)?),
            ResultView::Bilateral { right, left } => ResultView::Bilateral {
                right: right.try_map(&mut f)?,
                left: left.try_map(&mut f)?,
            },
        })
    }

    pub fn slots(&self) -> Vec<&ResultSlot<T>> {
        match self {
            ResultView::Single(slot) => vec![slot],
            ResultView::Bilateral { right, left } => vec![right, left],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub source_name: String,
    pub crops: CropPaths,
    pub prediction: Prediction,
    pub view: ResultView<PathBuf>,
}

/// Artifacts are named after the panel slot, never after the model's id, so
/// they stay inside the scratch directory and two slots never share a file.
fn render_slot(
    crops: &RoiCrops,
    assessment: &Assessment,
    scratch: &ScratchDir,
    slot: &str,
) -> Result<ResultSlot<PathBuf>> {
    let heatmap = scratch.artifact_path(&format!("{slot}_heatmap.png"));
    let bar_chart = scratch.artifact_path(&format!("{slot}_bar.png"));
    render_heatmap(crops, assessment, &heatmap)?;
    render_bar_chart(assessment, &bar_chart)?;
    Ok(ResultSlot {
        id: assessment.id.clone(),
        grade: assessment.grade(),
        heatmap,
        bar_chart,
    })
}

/// Persists the crops next to the source name, runs the classifier and
/// renders its answer into the scratch directory.
///
/// Blocking; the GUI calls it from a worker thread.
pub fn run_analysis(
    source_name: &str,
    crops: &RoiCrops,
    scratch: &ScratchDir,
    classifier: &dyn KneeClassifier,
) -> Result<AnalysisOutcome> {
    let _span = info_span!("analysis", source = source_name).entered();

    let crop_paths = scratch.persist_crops(source_name, crops)?;
    let prediction = classifier.infer(&crops.lateral, &crops.medial)?;
    prediction.validate()?;

    let view = match prediction.assessments.as_slice() {
        [single] => ResultView::Single(render_slot(crops, single, scratch, "single")?),
        [right, left, rest @ ..] => {
            if !rest.is_empty() {
                warn!(extra = rest.len(), "ignoring result ids beyond the bilateral pair");
            }
            ResultView::Bilateral {
                right: render_slot(crops, right, scratch, "right")?,
                left: render_slot(crops, left, scratch, "left")?,
            }
        }
        [] => return Err(ReviewError::Inference("model returned no result ids".into())),
    };

    info!(ids = ?prediction.ids(), bilateral = prediction.is_bilateral(), "analysis rendered");
    Ok(AnalysisOutcome {
        source_name: source_name.to_string(),
        crops: crop_paths,
        prediction,
        view,
    })
}
