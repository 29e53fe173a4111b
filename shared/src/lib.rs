use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Verdict returned by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    pub fn opposite(self) -> Self {
        match self {
            Label::Real => Label::Fake,
            Label::Fake => Label::Real,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub result: Label,
    pub confidence: f64,
    pub processing_time_ms: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    pub model_loaded: bool,
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}
