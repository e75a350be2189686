use serde::{Deserialize, Serialize};

/// Verdict returned for a diagnosed leaf image.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PredictionResult {
    pub class: String,
    pub confidence: f64,
    pub cause: String,
    pub problem: String,
    pub solution: String,
    pub care: String,
    pub prevention: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub classes: usize,
    pub records: usize,
}
