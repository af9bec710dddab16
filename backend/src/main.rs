mod analytics;
mod classifier;
mod db;
mod routes;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use classifier::model::Classifier;
use db::record_store::RecordStore;
use routes::configure_routes;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    dotenv::dotenv().ok();

    let model_path =
        env::var("MODEL_PATH").unwrap_or_else(|_| "model/mobilenetv2_tree_health.pt".to_string());
    let database_path =
        env::var("DATABASE_PATH").unwrap_or_else(|_| "database/tree_health.db".to_string());
    let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string());

    let classifier = match Classifier::load(&model_path) {
        Ok(classifier) => {
            log::info!("Loaded tree health model from {}", model_path);
            classifier
        }
        Err(e) => {
            log::error!("Failed to load model at startup: {:?}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Model loading failed: {:?}", e),
            ));
        }
    };

    let store = match RecordStore::open(&database_path) {
        Ok(store) => {
            log::info!("Record store ready at {}", database_path);
            store
        }
        Err(e) => {
            log::error!("Failed to open record store at startup: {:?}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Record store initialization failed: {:?}", e),
            ));
        }
    };

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

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
            .app_data(web::Data::new(classifier.clone()))
            .app_data(web::Data::new(store.clone()))
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
