use actix_multipart::MultipartError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;

use crate::inference::ClassifierError;
use crate::preprocess::NormalizeError;

/// Request-level failures of the `/predict` pipeline.
///
/// `Display` is the client-facing detail string.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("Model not available")]
    ModelUnavailable,
    #[error("Uploaded file is not an image")]
    InvalidInput,
    #[error("No file uploaded")]
    MissingFile,
    #[error("Invalid upload: {0}")]
    Upload(String),
    #[error("Uploaded file is too large")]
    TooLarge,
    #[error("Error processing image: {0}")]
    Decode(#[from] NormalizeError),
    #[error("Error processing image: {0}")]
    Inference(#[from] ClassifierError),
    #[error("Error processing image: {0}")]
    Worker(#[from] actix_web::error::BlockingError),
}

// MultipartError wraps actix_web::Error, which is !Send; keep only its message
// so the error can cross the blocking pool.
impl From<MultipartError> for PredictError {
    fn from(err: MultipartError) -> Self {
        PredictError::Upload(err.to_string())
    }
}

impl ResponseError for PredictError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PredictError::InvalidInput | PredictError::MissingFile | PredictError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            PredictError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            // Undecodable uploads are reported as processing failures.
            PredictError::Decode(_) | PredictError::Inference(_) | PredictError::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(
            PredictError::ModelUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PredictError::InvalidInput.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PredictError::TooLarge.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            PredictError::Inference(ClassifierError::EmptyOutput).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    fn assert_send<T: Send>() {}

    #[test]
    fn predict_error_can_leave_blocking_pool() {
        assert_send::<PredictError>();
        assert_send::<Result<crate::inference::PredictionResult, PredictError>>();
    }

    #[test]
    fn multipart_errors_keep_their_message() {
        let err = PredictError::from(MultipartError::Incomplete);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Invalid upload: "));
    }

    #[test]
    fn detail_strings_match_contract() {
        assert_eq!(PredictError::ModelUnavailable.to_string(), "Model not available");
        assert_eq!(
            PredictError::InvalidInput.to_string(),
            "Uploaded file is not an image"
        );
        assert_eq!(
            PredictError::Inference(ClassifierError::Runtime("shape mismatch".into())).to_string(),
            "Error processing image: model runtime error: shape mismatch"
        );
    }
}
