use std::fmt;
use std::sync::Arc;

use crate::preprocess::NormalizedTensor;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("model runtime error: {0}")]
    Runtime(String),
    #[error("model returned no output")]
    EmptyOutput,
    #[error("model returned out-of-range score {0}")]
    ScoreOutOfRange(f64),
    #[error("model lock poisoned")]
    Poisoned,
}

/// A loaded binary image classifier.
///
/// `predict` receives a `[1, H, W, 3]` tensor and returns the sigmoid
/// probability of the first batch element's only output unit. Implementations
/// are shared across request workers and must tolerate concurrent calls,
/// serializing internally if their runtime needs it.
pub trait Classifier: Send + Sync {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<f32, ClassifierError>;
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<f32, ClassifierError> {
        (**self).predict(tensor)
    }
}

/// Process-wide classifier, or the unavailable sentinel when no candidate
/// artifact could be loaded. Cheap to clone; never reloaded.
#[derive(Clone)]
pub struct ClassifierHandle {
    inner: Option<Arc<dyn Classifier>>,
}

impl ClassifierHandle {
    pub fn loaded<C: Classifier + 'static>(classifier: C) -> Self {
        Self {
            inner: Some(Arc::new(classifier)),
        }
    }

    pub fn from_arc(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            inner: Some(classifier),
        }
    }

    pub fn unavailable() -> Self {
        Self { inner: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.is_some()
    }

    pub fn classifier(&self) -> Option<&dyn Classifier> {
        self.inner.as_deref()
    }
}

impl fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierHandle")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
