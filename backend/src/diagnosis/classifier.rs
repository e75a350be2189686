use ndarray::Array4;
use std::sync::Arc;

use super::DiagnosisError;
use crate::model::{Classifier, ModelError};
use crate::tables::{ClassLabel, LabelTable};

/// Top-class extraction on top of an injected [`Classifier`].
#[derive(Clone)]
pub struct ClassifierAdapter {
    model: Arc<dyn Classifier>,
    labels: Arc<LabelTable>,
}

impl ClassifierAdapter {
    pub fn new(model: Arc<dyn Classifier>, labels: Arc<LabelTable>) -> Self {
        Self { model, labels }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Runs the model and checks its output against the label table.
    pub fn scores(&self, input: &Array4<f32>) -> Result<Vec<f32>, DiagnosisError> {
        let scores = self.model.classify(input)?;

        let expected = self.labels.class_count();
        if scores.len() != expected {
            return Err(ModelError::MalformedOutput(format!(
                "expected {} scores, got {}",
                expected,
                scores.len()
            ))
            .into());
        }
        if let Some(index) = scores.iter().position(|score| !score.is_finite()) {
            return Err(ModelError::MalformedOutput(format!(
                "score at index {} is not a finite number",
                index
            ))
            .into());
        }

        Ok(scores)
    }

    /// Returns the top label and its confidence as a percentage.
    pub fn classify(&self, input: &Array4<f32>) -> Result<(ClassLabel, f64), DiagnosisError> {
        let scores = self.scores(input)?;
        let (index, top) = top_score(&scores).ok_or_else(|| {
            DiagnosisError::from(ModelError::MalformedOutput("empty score vector".to_string()))
        })?;

        let label = match self.labels.get(index) {
            Some(label) => label.clone(),
            None => {
                log::error!(
                    "Model predicted index {} but the label table has no entry for it; \
                     the loaded model and class_indices disagree",
                    index
                );
                return Err(DiagnosisError::UnknownIndex {
                    index,
                    classes: self.labels.class_count(),
                });
            }
        };

        Ok((label, to_percentage(top)))
    }
}

/// Index and value of the highest score; the first one wins ties.
pub fn top_score(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (index, score)| match best {
            Some((_, top)) if score <= top => best,
            _ => Some((index, score)),
        })
}

/// `100 * score`, rounded to two decimals.
pub fn to_percentage(score: f32) -> f64 {
    (f64::from(score) * 100.0 * 100.0).round() / 100.0
}
