//! Thresholding, confidence and latency for a single classifier call.

use serde::Deserialize;
use shared::{Label, PredictionResponse};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use super::classifier::{ClassifierError, ClassifierHandle};
use crate::error::PredictError;
use crate::preprocess::NormalizedTensor;

pub const DECISION_THRESHOLD: f64 = 0.5;

/// Which label a score strictly above [`DECISION_THRESHOLD`] means.
///
/// This is a property of how the loaded weights were trained. Getting it
/// backwards inverts every prediction, so it has no default and must be
/// pinned in the model configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HighScoreFake,
    HighScoreReal,
}

impl Polarity {
    pub fn label_for(self, score: f64) -> Label {
        let high = match self {
            Polarity::HighScoreFake => Label::Fake,
            Polarity::HighScoreReal => Label::Real,
        };
        if score > DECISION_THRESHOLD {
            high
        } else {
            high.opposite()
        }
    }

    /// Probability mass the score assigns to `label`.
    pub fn mass_of(self, label: Label, score: f64) -> f64 {
        if self.label_for(1.0) == label {
            score
        } else {
            1.0 - score
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Polarity::HighScoreFake => "high_score_fake",
            Polarity::HighScoreReal => "high_score_real",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown polarity '{0}', expected high_score_fake or high_score_real")]
pub struct ParsePolarityError(String);

impl FromStr for Polarity {
    type Err = ParsePolarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high_score_fake" => Ok(Polarity::HighScoreFake),
            "high_score_real" => Ok(Polarity::HighScoreReal),
            other => Err(ParsePolarityError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub label: Label,
    /// Mass of `label`, in percent, 2 decimals.
    pub confidence_percent: f64,
    pub processing_time_ms: f64,
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        PredictionResponse {
            result: result.label,
            confidence: result.confidence_percent,
            processing_time_ms: result.processing_time_ms,
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Runs the classifier once on `tensor` and turns its score into a verdict.
pub fn decide(
    tensor: NormalizedTensor,
    handle: &ClassifierHandle,
    polarity: Polarity,
) -> Result<PredictionResult, PredictError> {
    let classifier = handle.classifier().ok_or(PredictError::ModelUnavailable)?;

    let start = Instant::now();
    let score = f64::from(classifier.predict(&tensor)?);
    if !(0.0..=1.0).contains(&score) {
        return Err(ClassifierError::ScoreOutOfRange(score).into());
    }

    let label = polarity.label_for(score);
    let confidence_percent = round2(polarity.mass_of(label, score) * 100.0);
    let processing_time_ms = round2(start.elapsed().as_secs_f64() * 1000.0);

    Ok(PredictionResult {
        label,
        confidence_percent,
        processing_time_ms,
    })
}
