use super::classifier::ClassifierHandle;
use super::decision::{decide, Polarity, PredictionResult};
use crate::config::ModelSettings;
use crate::error::PredictError;
use crate::preprocess::{normalize, InputSize};

/// Per-process detection context handed to every request.
///
/// Immutable after construction; clones share the same classifier.
#[derive(Debug, Clone)]
pub struct Detector {
    handle: ClassifierHandle,
    input_size: InputSize,
    polarity: Polarity,
}

impl Detector {
    pub fn new(handle: ClassifierHandle, input_size: InputSize, polarity: Polarity) -> Self {
        Self {
            handle,
            input_size,
            polarity,
        }
    }

    pub fn from_settings(handle: ClassifierHandle, settings: &ModelSettings) -> Self {
        Self::new(handle, settings.input_size, settings.polarity)
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_loaded()
    }

    pub fn input_size(&self) -> InputSize {
        self.input_size
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Full pipeline: bytes → tensor → verdict. Fails fast without touching
    /// the image when no classifier is loaded.
    pub fn detect(&self, image: &[u8]) -> Result<PredictionResult, PredictError> {
        if !self.is_ready() {
            return Err(PredictError::ModelUnavailable);
        }
        let tensor = normalize(image, self.input_size)?;
        decide(tensor, &self.handle, self.polarity)
    }
}
