mod config;
mod diagnosis;
mod model;
mod routes;
mod tables;
#[cfg(test)]
mod testing;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use config::{ConfigError, DiagnosisConfig};
use diagnosis::DiagnosisService;
use routes::{UploadLimits, configure_routes};
use std::env;
use std::sync::Arc;
use tables::{DiseaseTable, LabelTable};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = DiagnosisConfig::load().map_err(startup_error)?;
    let service = build_service(&config).map_err(startup_error)?;

    let service = web::Data::new(service);
    let limits = web::Data::new(UploadLimits {
        max_bytes: config.server.max_upload_bytes,
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
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(service.clone())
            .app_data(limits.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

/// Loads both lookup tables and the model, then verifies they agree.
fn build_service(config: &DiagnosisConfig) -> Result<DiagnosisService, ConfigError> {
    let labels = LabelTable::load(&config.tables.class_indices)?;
    let records = DiseaseTable::load(&config.tables.disease_info)?;

    for label in records.missing_labels(&labels) {
        log::warn!(
            "No disease record for '{}'; the Unknown record will be served instead",
            label
        );
    }

    let model = model::load_classifier(&config.model)?;
    let service = DiagnosisService::new(model, Arc::new(labels), Arc::new(records));
    service.self_check()?;
    Ok(service)
}

fn startup_error(e: ConfigError) -> std::io::Error {
    log::error!("Startup failed: {}", e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("Startup failed: {}", e))
}
