//! Main entry point for the YelpCamp server.
//! Serves the campground pages, the account pages and the static assets.

use std::sync::Arc;

use actix_files::Files;
use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use auth_services::jwt::JwtService;
use auth_services::middleware::AuthMiddleware;
use auth_services::service::AuthService;
use campgrounds::{ListingService, PgListingRepository};
use geocoder::GoogleGeocoder;
use image_store::{CloudinaryConfig, CloudinaryImageStore, ImageStore, MockImageStore};
use postgres::database::*;

mod config;
use config::ServerConfig;

fn image_store() -> Arc<dyn ImageStore> {
    let store = CloudinaryConfig::from_env().and_then(CloudinaryImageStore::new);
    match store {
        Ok(store) => {
            log::info!("🖼️ Cloudinary image store initialized successfully");
            Arc::new(store)
        }
        Err(e) => {
            log::warn!("⚠️ {}; falling back to the mock image store", e);
            Arc::new(MockImageStore)
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    log::info!("🚀 Starting YelpCamp server...");

    let config = ServerConfig::from_env();

    let pool = match create_connection_pool(&config.database_url).await {
        Ok(pool) => {
            log::info!("🗃️ Database pool created successfully");

            if let Err(e) = test_connection(&pool).await {
                log::error!("❌ Database connection test failed: {}", e);
            }
            pool
        }
        Err(e) => {
            log::error!("❌ Failed to create database pool: {}", e);
            log::error!("💡 Check DATABASE_URL and that PostgreSQL is running");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(&pool).await {
        log::error!("❌ Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    if config.geocoder_api_key.is_none() {
        log::warn!("⚠️ GEOCODER_API_KEY not set; address lookups will be denied");
    }
    let geocoder = match GoogleGeocoder::new(config.geocoder_api_key.clone().unwrap_or_default()) {
        Ok(geocoder) => Arc::new(geocoder),
        Err(e) => {
            log::error!("❌ Failed to create geocoder: {}", e);
            std::process::exit(1);
        }
    };

    let listing_service = ListingService::new(
        Arc::new(PgListingRepository::new(pool.clone())),
        geocoder,
        image_store(),
    );
    let auth_service = AuthService::new(pool.clone());
    let jwt_service = JwtService::new(&config.jwt_secret);
    let public_dir = config.public_dir.clone();

    log::info!("📁 Static files location: {}", public_dir);
    log::info!(
        "🌐 Server will be available at: http://{}:{}",
        config.bind_address,
        config.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(listing_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(Logger::default())
            .route(
                "/health",
                web::get().to(|| async { HttpResponse::Ok().body("OK") }),
            )
            .service(Files::new("/public", public_dir.clone()))
            .configure(web_handlers::configure)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}
