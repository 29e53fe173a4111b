use actix_multipart::{Multipart, MultipartError};
use actix_web::{web, HttpResponse};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use shared::{HealthResponse, PredictionResponse, StatusResponse};
use uuid::Uuid;

use crate::error::PredictError;
use crate::inference::Detector;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
const UPLOAD_FIELD: &str = "file";

/// Per-request upload limits.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(root)))
        .service(web::resource("/status").route(web::get().to(status)))
        .service(web::resource("/predict").route(web::post().to(predict)));
}

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "online".into(),
        message: "Deepfake Detection API is running".into(),
    })
}

async fn status(detector: web::Data<Detector>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        status: "operational".into(),
        model_loaded: detector.is_ready(),
        api_version: API_VERSION.into(),
    })
}

async fn predict(
    detector: web::Data<Detector>,
    limits: web::Data<UploadLimits>,
    payload: Multipart,
) -> Result<HttpResponse, PredictError> {
    let request_id = Uuid::new_v4();

    match run_prediction(&detector, &limits, payload).await {
        Ok(response) => {
            info!(
                "[{}] Prediction: {} with {}% confidence in {}ms",
                request_id, response.result, response.confidence, response.processing_time_ms
            );
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            match &e {
                PredictError::Decode(_) | PredictError::Inference(_) | PredictError::Worker(_) => {
                    error!("[{}] {}", request_id, e)
                }
                _ => warn!("[{}] Rejected prediction request: {}", request_id, e),
            }
            Err(e)
        }
    }
}

async fn run_prediction(
    detector: &web::Data<Detector>,
    limits: &UploadLimits,
    mut payload: Multipart,
) -> Result<PredictionResponse, PredictError> {
    if !detector.is_ready() {
        return Err(PredictError::ModelUnavailable);
    }

    let image_data = read_upload(&mut payload, limits.max_bytes).await?;

    let detector = detector.clone();
    let result = web::block(move || detector.detect(&image_data)).await??;
    Ok(result.into())
}

/// Finds the `file` part of the form, draining any other parts before it,
/// and reads it whole.
async fn read_upload(payload: &mut Multipart, max_bytes: usize) -> Result<Vec<u8>, PredictError> {
    loop {
        let mut field = match payload.try_next().await {
            Ok(Some(field)) => field,
            Ok(None) | Err(MultipartError::Incomplete) => return Err(PredictError::MissingFile),
            Err(e) => return Err(e.into()),
        };

        let name = field.content_disposition().and_then(|cd| cd.get_name());
        if name != Some(UPLOAD_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|mime| mime.essence_str().starts_with("image/"));
        if !is_image {
            return Err(PredictError::InvalidInput);
        }

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            if image_data.len() + data.len() > max_bytes {
                return Err(PredictError::TooLarge);
            }
            image_data.extend_from_slice(&data);
        }
        return Ok(image_data);
    }
}
