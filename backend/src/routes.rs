use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::TryStreamExt;
use log::{error, info};
use serde::Serialize;
use shared::AnalysisResult;
use uuid::Uuid;

use crate::analyzer::ArtAnalyzer;
use crate::config::AppConfig;
use crate::upload::{UploadError, validate_file_name, validate_size};

const UPLOAD_FIELD: &str = "artwork";

#[derive(Serialize)]
struct AnalyzeResponse {
    request_id: Uuid,
    #[serde(flatten)]
    result: AnalysisResult,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/analyze").route(web::post().to(analyze_artwork)))
        .service(web::resource("/api/models").route(web::get().to(model_status)));
}

async fn analyze_artwork(
    analyzer: web::Data<ArtAnalyzer>,
    config: web::Data<AppConfig>,
    payload: Multipart,
) -> Result<HttpResponse, Error> {
    let image_data = read_upload(payload, &config).await?;
    let request_id = Uuid::new_v4();
    info!("Analyzing upload {} ({} bytes)", request_id, image_data.len());

    let analyzer = analyzer.into_inner();
    let result = web::block(move || analyzer.analyze_bytes(&image_data))
        .await
        .map_err(|e| {
            error!("Analysis task for {} failed: {:?}", request_id, e);
            actix_web::error::ErrorInternalServerError(e)
        })?;

    if let Some(message) = &result.error {
        error!("Upload {} could not be analyzed: {}", request_id, message);
    }

    Ok(HttpResponse::Ok().json(AnalyzeResponse { request_id, result }))
}

/// Reads the `artwork` field; every rejection is an `UploadError` so the
/// client always gets a JSON `{"error": ...}` body.
async fn read_upload(mut payload: Multipart, config: &AppConfig) -> Result<Vec<u8>, UploadError> {
    let mut upload: Option<Vec<u8>> = None;

    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(UPLOAD_FIELD) || upload.is_some() {
            while field.try_next().await?.is_some() {}
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);
        validate_file_name(file_name.as_deref(), config)?;

        let mut image_data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            validate_size(image_data.len() + chunk.len(), config)?;
            image_data.extend_from_slice(&chunk);
        }
        upload = Some(image_data);
    }

    upload.ok_or(UploadError::NoFile)
}

async fn model_status(analyzer: web::Data<ArtAnalyzer>) -> HttpResponse {
    HttpResponse::Ok().json(analyzer.registry().status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelPaths;
    use crate::inference::ModelRegistry;
    use crate::inference::model::testing::FixedOutput;
    use crate::inference::registry::{LoadFailure, SlotState};
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test};
    use image::{DynamicImage, Rgb, RgbImage};
    use serde_json::Value;
    use std::io::Cursor;
    use std::path::PathBuf;

    const BOUNDARY: &str = "----artworkboundary";

    fn absent() -> SlotState {
        SlotState::Absent(LoadFailure::Empty {
            path: PathBuf::from("empty.pt"),
        })
    }

    fn analyzer() -> web::Data<ArtAnalyzer> {
        let slots = [
            SlotState::Present(Box::new(FixedOutput(vec![0.1]))),
            absent(),
            absent(),
        ];
        web::Data::new(ArtAnalyzer::new(ModelRegistry::from_states(ModelPaths::default(), slots)))
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([200, 10, 10])))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn multipart(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post(config: AppConfig, body: Vec<u8>) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new()
                .app_data(analyzer())
                .app_data(web::Data::new(config))
                .configure(configure_routes),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/analyze")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn analyzes_valid_upload() {
        let (status, body) = post(AppConfig::default(), multipart("artwork", "piece.png", &png_bytes())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authenticity"]["prediction"], "AI Generated");
        assert_eq!(body["authenticity"]["is_human"], false);
        assert_eq!(body["style"]["error"], "Style models not available");
        assert!(body["error"].is_null());
        assert!(body["request_id"].is_string());
    }

    #[actix_web::test]
    async fn rejects_missing_field() {
        let (status, body) = post(AppConfig::default(), multipart("other", "piece.png", &png_bytes())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[actix_web::test]
    async fn rejects_disallowed_extension() {
        let (status, body) = post(AppConfig::default(), multipart("artwork", "piece.svg", b"<svg/>")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid file type");
    }

    #[actix_web::test]
    async fn rejects_oversized_upload() {
        let mut config = AppConfig::default();
        config.max_upload_bytes = 16;
        let (status, body) = post(config, multipart("artwork", "piece.png", &png_bytes())).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "File too large");
    }

    #[actix_web::test]
    async fn undecodable_upload_reports_error_field() {
        let (status, body) = post(AppConfig::default(), multipart("artwork", "piece.png", b"garbage")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["authenticity"].is_null());
        assert!(body["error"].as_str().unwrap().starts_with("Error during analysis:"));
    }

    #[actix_web::test]
    async fn truncated_multipart_is_json_error() {
        let mut body = multipart("artwork", "piece.png", &png_bytes());
        let terminator = format!("\r\n--{BOUNDARY}--\r\n").len();
        body.truncate(body.len() - terminator);
        let (status, body) = post(AppConfig::default(), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Upload failed:"));
    }

    #[actix_web::test]
    async fn lists_model_status() {
        let app = test::init_service(App::new().app_data(analyzer()).configure(configure_routes)).await;
        let req = test::TestRequest::get().uri("/api/models").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["slot"], "authenticity");
        assert_eq!(body[0]["loaded"], true);
        assert_eq!(body[1]["loaded"], false);
        assert!(body[1]["error"].as_str().unwrap().contains("empty"));
    }
}
