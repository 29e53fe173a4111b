pub mod classifier;
pub mod decision;
pub mod detector;
pub mod provider;
#[cfg(feature = "torch")]
pub mod torch;

pub use classifier::{Classifier, ClassifierError, ClassifierHandle};
pub use decision::{decide, Polarity, PredictionResult, DECISION_THRESHOLD};
pub use detector::Detector;
pub use provider::{load_artifact, load_first, LoadError};
