use actix_multipart::MultipartError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::config::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    NoFile,
    #[error("No file selected")]
    NoFileSelected,
    #[error("Invalid file type")]
    InvalidType,
    #[error("File too large")]
    TooLarge,
    #[error("Upload failed: {0}")]
    Payload(String),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        UploadError::Payload(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

pub fn file_extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn validate_file_name(file_name: Option<&str>, config: &AppConfig) -> Result<(), UploadError> {
    let file_name = match file_name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(UploadError::NoFileSelected),
    };
    match file_extension(file_name) {
        Some(ext) if config.is_allowed_extension(&ext) => Ok(()),
        _ => Err(UploadError::InvalidType),
    }
}

pub fn validate_size(received: usize, config: &AppConfig) -> Result<(), UploadError> {
    if received > config.max_upload_bytes {
        return Err(UploadError::TooLarge);
    }
    Ok(())
}
