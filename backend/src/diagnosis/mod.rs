//! Raw upload bytes -> diagnosis verdict.
//!
//! Three forward-only stages: [`normalizer`] turns bytes into a model batch,
//! [`classifier`] picks the top class from the injected model, and [`verdict`]
//! applies the unknown-rejection policy and joins the guidance record.

pub mod classifier;
pub mod normalizer;
pub mod verdict;

use ndarray::Array4;
use shared::PredictionResult;
use std::sync::Arc;

use crate::model::{Classifier, ModelError};
use crate::tables::{DiseaseTable, LabelTable};
use classifier::ClassifierAdapter;

#[derive(Debug, thiserror::Error)]
pub enum DiagnosisError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[from] ModelError),
    #[error("Predicted index {index} has no label ({classes} output classes configured)")]
    UnknownIndex { index: usize, classes: usize },
}

#[derive(Clone)]
pub struct DiagnosisService {
    adapter: ClassifierAdapter,
    records: Arc<DiseaseTable>,
}

impl DiagnosisService {
    pub fn new(
        model: Arc<dyn Classifier>,
        labels: Arc<LabelTable>,
        records: Arc<DiseaseTable>,
    ) -> Self {
        Self {
            adapter: ClassifierAdapter::new(model, labels),
            records,
        }
    }

    pub fn diagnose(&self, raw: &[u8]) -> Result<PredictionResult, DiagnosisError> {
        let input = normalizer::normalize(raw)?;
        let (label, confidence) = self.adapter.classify(&input)?;
        Ok(verdict::compose(label, confidence, &self.records))
    }

    /// Feeds a blank batch through the model so a class-count mismatch with
    /// the label table fails startup instead of the first request.
    pub fn self_check(&self) -> Result<(), DiagnosisError> {
        let blank = Array4::<f32>::zeros(normalizer::input_shape());
        self.adapter.scores(&blank)?;
        log::info!(
            "Model self-check passed ({} output classes)",
            self.class_count()
        );
        Ok(())
    }

    pub fn class_count(&self) -> usize {
        self.adapter.labels().class_count()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}
