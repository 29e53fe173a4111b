use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use deepfake_api::config::DetectorConfig;
use deepfake_api::inference::{load_artifact, load_first, Detector};
use deepfake_api::routes::{configure_routes, UploadLimits};
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = DetectorConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    let settings = config.model_settings().map_err(|e| {
        log::error!("Invalid model configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    let handle = load_first(&settings.candidates, settings.input_size, load_artifact);
    let detector = web::Data::new(Detector::from_settings(handle, &settings));
    log::info!(
        "Model input {}, polarity {}",
        detector.input_size(),
        detector.polarity()
    );
    if !detector.is_ready() {
        log::warn!("No model available; /predict will answer 503");
    }

    let limits = web::Data::new(UploadLimits {
        max_bytes: config.limits.max_upload_bytes,
    });

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(detector.clone())
            .app_data(limits.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
