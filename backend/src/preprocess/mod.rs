pub mod normalizer;

pub use normalizer::{normalize, InputSize, NormalizeError, NormalizedTensor};
