//! Startup model loading.
//!
//! Candidate artifacts are tried in order. Each candidate is loaded and then
//! run once on an all-black tensor of the configured input size, so weights
//! trained for a different resolution are rejected here rather than on the
//! first request. The first candidate that passes becomes the process-wide
//! [`ClassifierHandle`]; if none does, the handle is the unavailable sentinel.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::classifier::{Classifier, ClassifierError, ClassifierHandle};
use crate::preprocess::{InputSize, NormalizedTensor};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),
    #[error("model backend not compiled in (enable the `torch` feature)")]
    BackendDisabled,
    #[error("failed to load model: {0}")]
    Backend(String),
    #[error("model rejected a {size} input: {source}")]
    InputRejected {
        size: InputSize,
        #[source]
        source: ClassifierError,
    },
}

/// Tries `candidates` in order with `load`, returning the first classifier
/// that loads and accepts the configured input size.
pub fn load_first<F>(candidates: &[PathBuf], input_size: InputSize, load: F) -> ClassifierHandle
where
    F: Fn(&Path, InputSize) -> Result<Arc<dyn Classifier>, LoadError>,
{
    for path in candidates {
        log::info!("Trying model candidate {}", path.display());
        match load(path, input_size).and_then(|classifier| check_input_size(classifier, input_size)) {
            Ok(classifier) => {
                log::info!("Model loaded successfully from {}", path.display());
                return ClassifierHandle::from_arc(classifier);
            }
            Err(e) => log::warn!("Model candidate {} failed: {}", path.display(), e),
        }
    }

    log::error!(
        "Failed to load model from any of {} candidate(s); serving without a model",
        candidates.len()
    );
    ClassifierHandle::unavailable()
}

fn check_input_size(
    classifier: Arc<dyn Classifier>,
    input_size: InputSize,
) -> Result<Arc<dyn Classifier>, LoadError> {
    let score = classifier
        .predict(&NormalizedTensor::zeros(input_size))
        .map_err(|source| LoadError::InputRejected {
            size: input_size,
            source,
        })?;
    if !(0.0..=1.0).contains(&score) {
        return Err(LoadError::InputRejected {
            size: input_size,
            source: ClassifierError::ScoreOutOfRange(f64::from(score)),
        });
    }
    Ok(classifier)
}

/// Loads a serialized classifier with the backend compiled into this build.
pub fn load_artifact(path: &Path, input_size: InputSize) -> Result<Arc<dyn Classifier>, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    load_backend(path, input_size)
}

#[cfg(feature = "torch")]
fn load_backend(path: &Path, input_size: InputSize) -> Result<Arc<dyn Classifier>, LoadError> {
    let classifier = super::torch::TorchClassifier::load(path, input_size)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "torch"))]
fn load_backend(_path: &Path, _input_size: InputSize) -> Result<Arc<dyn Classifier>, LoadError> {
    Err(LoadError::BackendDisabled)
}
