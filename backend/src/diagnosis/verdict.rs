use shared::PredictionResult;

use crate::tables::{ClassLabel, DiseaseTable};

/// Predictions below this confidence (percent) are reported as `Unknown`.
pub const CONFIDENCE_THRESHOLD: f64 = 70.0;

pub fn is_rejected(label: &ClassLabel, confidence: f64) -> bool {
    // NaN never clears the threshold.
    !(confidence >= CONFIDENCE_THRESHOLD) || label.is_unknown()
}

/// Applies the unknown-rejection policy and attaches the guidance record.
pub fn compose(label: ClassLabel, confidence: f64, records: &DiseaseTable) -> PredictionResult {
    let class = if is_rejected(&label, confidence) {
        ClassLabel::unknown()
    } else {
        label
    };
    let record = records.record_for(&class);

    PredictionResult {
        confidence,
        cause: record.cause.clone(),
        problem: record.problem.clone(),
        solution: record.solution.clone(),
        care: record.care.clone(),
        prevention: record.prevention.clone(),
        class: class.into_string(),
    }
}
