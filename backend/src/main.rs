use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use backend::analyzer::ArtAnalyzer;
use backend::config::AppConfig;
use backend::inference::{ModelLoader, ModelRegistry};
use backend::routes::configure_routes;
use std::env;

#[cfg(feature = "torch")]
fn model_loader() -> Box<dyn ModelLoader> {
    Box::new(backend::inference::torch::TorchScriptLoader::new())
}

#[cfg(not(feature = "torch"))]
fn model_loader() -> Box<dyn ModelLoader> {
    log::warn!("Built without the `torch` feature; model artifacts cannot be deserialized");
    Box::new(backend::inference::model::UnsupportedLoader)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let loader = model_loader();
    let registry = ModelRegistry::load(&config.models, loader.as_ref());
    let analyzer = web::Data::new(ArtAnalyzer::new(registry));

    let bind_address = config.bind_address();
    let app_config = web::Data::new(config);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
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
            .app_data(analyzer.clone())
            .app_data(app_config.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
