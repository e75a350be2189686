use actix_multipart::{Multipart, MultipartError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use sha2::{Digest, Sha256};
use shared::{ErrorResponse, HealthResponse};

use crate::diagnosis::{DiagnosisError, DiagnosisService};

const FILE_FIELD: &str = "file";

#[derive(Clone, Copy, Debug)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

enum Upload {
    Missing,
    TooLarge,
    Received(Vec<u8>),
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/predict").route(web::post().to(handle_predict)))
        .service(web::resource("/health").route(web::get().to(health)));
}

fn image_digest(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(hasher.finalize())
}

fn error_status(err: &DiagnosisError) -> StatusCode {
    match err {
        DiagnosisError::Decode(_) => StatusCode::BAD_REQUEST,
        DiagnosisError::ModelInvocation(_) | DiagnosisError::UnknownIndex { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn read_file_field(
    payload: &mut Multipart,
    max_bytes: usize,
) -> Result<Upload, MultipartError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(FILE_FIELD) {
            while field.try_next().await?.is_some() {}
            continue;
        }

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            if image_data.len() + data.len() > max_bytes {
                return Ok(Upload::TooLarge);
            }
            image_data.extend_from_slice(&data);
        }
        return Ok(Upload::Received(image_data));
    }
    Ok(Upload::Missing)
}

async fn handle_predict(
    service: web::Data<DiagnosisService>,
    limits: web::Data<UploadLimits>,
    mut payload: Multipart,
) -> HttpResponse {
    let image_data = match read_file_field(&mut payload, limits.max_bytes).await {
        Ok(Upload::Received(image_data)) => image_data,
        Ok(Upload::Missing) => {
            warn!("Prediction request without a '{}' field", FILE_FIELD);
            return HttpResponse::BadRequest().json(ErrorResponse::new("No file uploaded"));
        }
        Ok(Upload::TooLarge) => {
            warn!("Upload exceeds {} bytes", limits.max_bytes);
            return HttpResponse::PayloadTooLarge().json(ErrorResponse::new("File too large"));
        }
        Err(e) => {
            warn!("Unreadable multipart upload: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse::new("No file uploaded"));
        }
    };

    let digest = image_digest(&image_data);
    let digest = &digest[..12];
    let service = service.into_inner();
    let outcome = match web::block(move || service.diagnose(&image_data)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Image {}: inference worker failed: {}", digest, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::new("Inference worker failed"));
        }
    };

    match outcome {
        Ok(result) => {
            info!(
                "Image {}: {} ({:.2}%)",
                digest, result.class, result.confidence
            );
            HttpResponse::Ok().json(result)
        }
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                error!("Image {}: {}", digest, e);
            } else {
                warn!("Image {}: {}", digest, e);
            }
            HttpResponse::build(status).json(ErrorResponse::new(e.to_string()))
        }
    }
}

async fn health(service: web::Data<DiagnosisService>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        classes: service.class_count(),
        records: service.record_count(),
    })
}
