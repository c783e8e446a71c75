mod borrowers;
mod circuit_breaker;
mod config;
mod db;
mod errors;
mod geocode;
mod handlers;
mod models;
mod portfolio;
mod regions;
mod scoring;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::geocode::GeocodeClient;
use crate::scoring::RiskScorer;

/// Serves the OpenAPI specification YAML file.
///
/// Reads `openapi.yml` from the filesystem and serves it with the
/// appropriate content type; 404 when the file is missing.
async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI spec not found").into_response(),
    }
}

/// Serves the Swagger UI HTML page.
///
/// Returns an HTML page embedding Swagger UI, configured to load the
/// specification served by `serve_openapi_spec`.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Credit Risk API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool, the scoring
/// model (fatal when its artifact is missing), the geocoding client, the
/// region cache, and the HTTP routes with their middleware, then starts
/// the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credit_risk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Load the scoring model. This is a startup-time requirement: without
    // the artifact the scoring path cannot run at all.
    let scorer = RiskScorer::load(&config.model_path)
        .map_err(|e| anyhow::anyhow!("failed to load scoring model: {}", e))?;
    tracing::info!("Scoring model loaded from {}", config.model_path);

    // Initialize geocoding client. Unlike the model this is best-effort:
    // region resolution proceeds without coordinates when it is down.
    let geocoder = match GeocodeClient::new(&config) {
        Ok(client) => {
            tracing::info!("Geocoding client initialized: {}", config.geocode_base_url);
            Some(client)
        }
        Err(e) => {
            tracing::error!("Failed to initialize geocoding client: {}", e);
            None
        }
    };

    // Region name -> region cache (1 hour TTL, 10k max entries)
    // Skips repeated region lookups during borrower onboarding
    let region_cache = Cache::builder()
        .time_to_live(Duration::from_secs(3600))
        .max_capacity(10_000)
        .build();
    tracing::info!("Region resolution cache initialized");

    // Build application state
    let app_state = Arc::new(crate::handlers::AppState {
        db: db.pool.clone(),
        config: config.clone(),
        scorer: Arc::new(scorer),
        geocoder,
        region_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_spec))
        // Scoring endpoint
        .route("/credit-score", post(handlers::score_features))
        // Borrower endpoints
        .route(
            "/api/borrowers",
            get(handlers::list_borrowers).post(handlers::create_borrower),
        )
        .route(
            "/api/borrowers/:id",
            get(handlers::get_borrower).delete(handlers::delete_borrower),
        )
        .route(
            "/api/borrowers/:id/transactions",
            get(handlers::list_borrower_transactions).post(handlers::create_borrower_transaction),
        )
        .route(
            "/api/borrowers/:id/documents",
            get(handlers::list_borrower_documents).post(handlers::create_borrower_document),
        )
        // Region endpoints
        .route("/api/regions", get(handlers::list_regions))
        .route("/api/regions/:id", delete(handlers::delete_region))
        // Portfolio statistics
        .route("/api/stats/global", get(handlers::global_stats))
        .route("/api/stats/regions", get(handlers::region_stats))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload (prevents memory exhaustion)
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
