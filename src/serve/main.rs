//! HTTP server for TERYT code lookups.
//!
//! Resolves postal code, locality and street into TERC/SIMC/ULIC codes and
//! lists the localities and streets behind a postal code.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use teryt_resolver::config::Config;
use teryt_resolver::{AddressLookup, AddressQuery, AddressService, LocalityDetails, ResolveError};

#[derive(Parser, Debug)]
#[command(name = "serve")]
#[command(about = "TERYT address resolution server")]
struct Args {
    /// Config file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,
}

/// Application state shared across handlers
struct AppState {
    service: AddressService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("TERYT Resolver Server");

    let config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            Config::load_from_file(path)?
        }
        None => Config::default(),
    };

    // Everything is loaded before the listener binds
    let service = AddressService::from_config(&config).context("Failed to load reference data")?;
    info!(
        "Loaded {} postal-code rows, registry backend '{}'",
        service.postal_index().len(),
        service.backend()
    );

    let state = Arc::new(AppState { service });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/postal_codes/{postal_code}/localities",
            get(localities_handler),
        )
        .route("/postal_codes/{postal_code}/details", get(details_handler))
        .route("/lookup/address", get(lookup_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);

    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(e: ResolveError) -> (StatusCode, String) {
    let status = match &e {
        ResolveError::InvalidPostalCode(_) | ResolveError::AmbiguousLocality { .. } => {
            StatusCode::BAD_REQUEST
        }
        ResolveError::PostalCodeNotFound(_) | ResolveError::LocalityNotInPostalCode { .. } => {
            StatusCode::NOT_FOUND
        }
        ResolveError::IncompleteRecord { .. } => {
            error!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ResolveError::RegistryUnavailable(_) => {
            warn!("{}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (status, e.to_string())
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.service.backend(),
        postal_codes: state.service.postal_index().len(),
        as_of: state.service.as_of().to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
    postal_codes: usize,
    as_of: String,
}

#[derive(Serialize)]
struct LocalitiesResponse {
    postal_code: String,
    localities: Vec<String>,
}

/// Localities served by a postal code
async fn localities_handler(
    State(state): State<Arc<AppState>>,
    Path(postal_code): Path<String>,
) -> Result<Json<LocalitiesResponse>, (StatusCode, String)> {
    let localities = state
        .service
        .localities(&postal_code)
        .map_err(error_response)?;

    Ok(Json(LocalitiesResponse {
        postal_code,
        localities,
    }))
}

#[derive(Debug, Deserialize)]
struct DetailsQueryParams {
    locality: Option<String>,
}

/// Codes and streets of one locality
async fn details_handler(
    State(state): State<Arc<AppState>>,
    Path(postal_code): Path<String>,
    Query(params): Query<DetailsQueryParams>,
) -> Result<Json<LocalityDetails>, (StatusCode, String)> {
    let details = state
        .service
        .details(&postal_code, params.locality.as_deref())
        .await
        .map_err(error_response)?;
    Ok(Json(details))
}

#[derive(Debug, Deserialize)]
struct LookupQueryParams {
    postal_code: String,
    locality: String,
    street_name: Option<String>,
}

/// Resolve an address to TERC/SIMC/ULIC codes
async fn lookup_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupQueryParams>,
) -> Result<Json<AddressLookup>, (StatusCode, String)> {
    let query = AddressQuery::new(
        &params.postal_code,
        &params.locality,
        params.street_name.as_deref(),
    );
    let lookup = state
        .service
        .lookup(&query)
        .await
        .map_err(error_response)?;
    Ok(Json(lookup))
}
