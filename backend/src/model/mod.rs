#[cfg(feature = "torch")]
pub mod torch;

use ndarray::Array4;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ModelConfig;

#[allow(dead_code)]
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model file not found: {0}")]
    NotFound(PathBuf),
    #[error("Model backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),
    #[cfg(feature = "torch")]
    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),
}

/// A trained image classifier.
///
/// Takes one normalized batch (`[1, 128, 128, 3]`, values in `[0, 1]`) and
/// returns one score per class, conventionally a softmax distribution.
/// Implementations must be safe to call from several request threads.
pub trait Classifier: Send + Sync {
    fn classify(&self, input: &Array4<f32>) -> Result<Vec<f32>, ModelError>;
}

/// Loads the configured model artifact once at startup.
#[cfg(feature = "torch")]
pub fn load_classifier(config: &ModelConfig) -> Result<Arc<dyn Classifier>, ModelError> {
    let classifier = torch::TorchClassifier::load(config)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "torch"))]
pub fn load_classifier(config: &ModelConfig) -> Result<Arc<dyn Classifier>, ModelError> {
    log::error!(
        "Cannot load {}: no model backend compiled in",
        config.path.display()
    );
    Err(ModelError::BackendUnavailable(
        "built with --no-default-features; enable the `torch` feature to serve TorchScript models".to_string(),
    ))
}

/// Numerically stable softmax over raw logits.
#[cfg_attr(not(feature = "torch"), allow(dead_code))]
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
