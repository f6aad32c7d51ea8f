//! # Workbench HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET  /health` - Health check
//! - `GET  /status` - Bundle status
//! - `POST /objects` - Upsert a domain object / observable
//! - `POST /relationships` - Upsert a core relationship
//! - `POST /containers` - Upsert a container
//! - `POST /delete` - Cascade-delete a selection
//! - `POST /retype` - Change an observable's concrete type
//! - `POST /markings` - Apply markings to a selection
//! - `POST /context` - Reconcile an anchor's context relationships
//! - `POST /load` - Classify and merge an external document
//! - `POST /export` - Export the bundle document
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `WORKBENCH_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `WORKBENCH_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `WORKBENCH_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
// Re-export handlers and types for integration tests (via `workbench::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    context_handler, delete_handler, export_handler, health_handler, load_handler,
    markings_handler, retype_handler, status_handler, upsert_container_handler,
    upsert_entity_handler, upsert_relationship_handler,
};
#[allow(unused_imports)]
pub use types::{
    ContextRequest, ContextResponse, DeleteRequest, DeleteResponse, ExportRequest, ExportResponse,
    HealthResponse, LoadResponse, MarkingRequest, MarkingResponse, RetypeRequest, RetypeResponse,
    StatusResponse, UpsertResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use workbench_core::{Bundle, TypeSchema, WorkbenchError, primitives::MAX_DOCUMENT_SIZE};

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the bundle behind a single write lock plus the
/// injected type schema.
#[derive(Clone)]
pub struct AppState {
    /// The working bundle. One mutator at a time: every mutation entry
    /// point needs exclusive access to all four partitions.
    pub bundle: Arc<RwLock<Bundle>>,
    /// The injected classification table.
    pub schema: Arc<TypeSchema>,
}

impl AppState {
    /// Create new app state from a loaded bundle and schema.
    #[must_use]
    pub fn new(bundle: Bundle, schema: TypeSchema) -> Self {
        Self {
            bundle: Arc::new(RwLock::new(bundle)),
            schema: Arc::new(schema),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `WORKBENCH_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("WORKBENCH_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (WORKBENCH_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in WORKBENCH_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No WORKBENCH_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - protects against DoS (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    // Check if rate limiting is enabled
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // Check if authentication is enabled
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "⚠️  API key authentication DISABLED - all endpoints are publicly accessible! \
             Set WORKBENCH_API_KEY environment variable to enable authentication."
        );
    }

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/objects", post(handlers::upsert_entity_handler))
        .route("/relationships", post(handlers::upsert_relationship_handler))
        .route("/containers", post(handlers::upsert_container_handler))
        .route("/delete", post(handlers::delete_handler))
        .route("/retype", post(handlers::retype_handler))
        .route("/markings", post(handlers::markings_handler))
        .route("/context", post(handlers::context_handler))
        .route("/load", post(handlers::load_handler))
        .route("/export", post(handlers::export_handler));

    // Apply authentication middleware (innermost - runs last on request)
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_DOCUMENT_SIZE))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, bundle: Bundle, schema: TypeSchema) -> Result<(), WorkbenchError> {
    let state = AppState::new(bundle, schema);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| WorkbenchError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Workbench HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| WorkbenchError::IoError(format!("Server error: {}", e)))
}
