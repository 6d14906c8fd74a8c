#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for census sector resolution.
//!
//! Exposes the resolution engine over JSON:
//!
//! - `POST /api/setor-censitario` resolves one address or coordinate pair
//! - `POST /api/setor-censitario-batch` resolves up to the configured
//!   number of items, one result per item in input order
//! - `GET /api/health`

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use sector_map_geocoder::service_registry::{self, RegistryError};
use sector_map_geography::GeoError;
use sector_map_geography::reference::ReferenceDataset;
use sector_map_resolver::{ConfigError, EngineConfig, Resolver};
use thiserror::Error;

/// Largest accepted JSON body. Sized for a full batch of address items.
const JSON_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The reference dataset failed to load.
    #[error(transparent)]
    Dataset(#[from] GeoError),

    /// The collaborator registry failed to load.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The engine config failed to load.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or running the HTTP server failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// The resolution engine.
    pub resolver: Resolver,
    /// Batch policy.
    pub config: EngineConfig,
}

/// Registers the API routes and JSON extractor settings.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(handlers::json_error_handler),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/setor-censitario", web::post().to(handlers::resolve_sector))
            .route(
                "/setor-censitario-batch",
                web::post().to(handlers::resolve_sector_batch),
            ),
    );
}

/// Starts the census sector API server.
///
/// Loads the reference dataset, the engine config and the collaborators,
/// then starts the Actix-Web HTTP server on `BIND_ADDR:PORT` (default
/// `127.0.0.1:8080`). Setting `SECTOR_MAP_OFFLINE` disables the external
/// collaborators. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if startup data fails to load or the HTTP
/// server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Loading reference dataset...");
    let dataset = Arc::new(ReferenceDataset::embedded()?);
    log::info!(
        "Loaded dataset '{}' v{} ({} municipalities)",
        dataset.name(),
        dataset.version(),
        dataset.areas().len()
    );

    let config = EngineConfig::from_env()?;
    log::info!(
        "Engine config: max_batch_items={}, pacing={}ms, concurrency={}",
        config.max_batch_items,
        config.pacing_ms,
        config.concurrency
    );

    let resolver = if std::env::var_os("SECTOR_MAP_OFFLINE").is_some() {
        log::warn!("SECTOR_MAP_OFFLINE set, external services disabled");
        Resolver::offline(dataset)
    } else {
        Resolver::new(
            dataset,
            service_registry::build_geocoder()?,
            service_registry::build_sector_lookup()?,
        )
    };

    let state = web::Data::new(AppState { resolver, config });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
