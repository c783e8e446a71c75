use crate::borrowers::{validate_new_borrower, validate_phone, BorrowerStore, NewBorrower};
use crate::config::Config;
use crate::errors::AppError;
use crate::geocode::GeocodeClient;
use crate::models::*;
use crate::portfolio::PortfolioService;
use crate::regions::RegionService;
use crate::scoring::{round2, RiskScorer};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Scoring model capability, loaded at startup (fatal when absent).
    pub scorer: Arc<RiskScorer>,
    /// Geocoding client (optional; region resolution degrades without it).
    pub geocoder: Option<GeocodeClient>,
    /// Region name -> region cache to skip repeated lookups during onboarding.
    pub region_cache: Cache<String, Region>,
}

impl AppState {
    fn regions(&self) -> RegionService {
        RegionService::new(
            self.db.clone(),
            self.region_cache.clone(),
            self.geocoder.clone(),
        )
    }

    fn borrowers(&self) -> BorrowerStore {
        BorrowerStore::new(self.db.clone())
    }

    fn portfolio(&self) -> PortfolioService {
        PortfolioService::new(self.db.clone())
    }
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "credit-risk-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /credit-score
///
/// Scores a feature vector: probability of default, credit score, and
/// risk tier. The endpoint is pure; nothing is persisted.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `features` - The fixed-shape feature vector.
///
/// # Returns
///
/// * `Result<Json<ScoreResponse>, AppError>` - The scoring outcome or an error.
pub async fn score_features(
    State(state): State<Arc<AppState>>,
    Json(features): Json<FeatureVector>,
) -> Result<Json<ScoreResponse>, AppError> {
    let outcome = state.scorer.score(&features)?;

    tracing::info!(
        "Scored feature vector: PD={:.4} score={} tier={:?}",
        outcome.probability,
        outcome.credit_score,
        outcome.risk_level
    );

    Ok(Json(ScoreResponse {
        pd: round2(outcome.probability),
        credit_score: outcome.credit_score,
        risk_level: outcome.risk_level,
    }))
}

/// POST /api/borrowers
///
/// Creates a borrower. When a region name is supplied the region is
/// resolved or created first (with best-effort coordinates); when a
/// feature vector is supplied the borrower is persisted already scored.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - The borrower fields plus optional region and features.
///
/// # Returns
///
/// * `Result<(StatusCode, Json<BorrowerRecord>), AppError>` - 201 with the
///   stored borrower joined with its region, or an error.
pub async fn create_borrower(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBorrowerRequest>,
) -> Result<(StatusCode, Json<BorrowerRecord>), AppError> {
    tracing::info!(
        "POST /api/borrowers - {} {}",
        payload.first_name,
        payload.last_name
    );

    validate_new_borrower(&payload)?;

    let region_id = match payload.region_name.as_deref() {
        Some(name) => {
            let region = state
                .regions()
                .resolve_or_create(name, payload.latitude, payload.longitude)
                .await?;
            Some(region.region_id)
        }
        None => None,
    };

    // Scoring is independent of the region; both feed the stored record.
    let outcome = match payload.features.as_ref() {
        Some(features) => Some(state.scorer.score(features)?),
        None => None,
    };

    let phone = payload.phone.as_deref().map(|raw| {
        let (_, normalized) = validate_phone(raw);
        normalized
    });

    let borrower = state
        .borrowers()
        .insert(NewBorrower {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            phone,
            loan_amount: payload.loan_amount,
            loan_date: payload
                .loan_date
                .unwrap_or_else(|| chrono::Utc::now().date_naive()),
            decision: payload.decision.unwrap_or(Decision::Pending),
            region_id,
            credit_score: outcome.map(|o| o.credit_score),
            risk_level: outcome.map(|o| o.risk_level),
            probability_of_default: outcome.map(|o| o.probability),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(borrower)))
}

/// GET /api/borrowers?skip&limit
///
/// Lists borrowers in stable ascending-id order with their region
/// attributes. Rejects out-of-range paging before querying.
pub async fn list_borrowers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BorrowerRecord>>, AppError> {
    let borrowers = state.borrowers().list(params.skip, params.limit).await?;
    Ok(Json(borrowers))
}

/// GET /api/borrowers/:id
///
/// Retrieves a borrower by id, joined with its region attributes.
pub async fn get_borrower(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<i64>,
) -> Result<Json<BorrowerRecord>, AppError> {
    tracing::info!("GET /api/borrowers/{}", borrower_id);
    let borrower = state.borrowers().get(borrower_id).await?;
    Ok(Json(borrower))
}

/// DELETE /api/borrowers/:id
///
/// Administrative deletion. The borrower's transactions and documents are
/// removed with it.
pub async fn delete_borrower(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("DELETE /api/borrowers/{}", borrower_id);
    let (transactions, documents) = state.borrowers().delete(borrower_id).await?;

    Ok(Json(json!({
        "success": true,
        "borrower_id": borrower_id,
        "transactions_deleted": transactions,
        "documents_deleted": documents
    })))
}

/// GET /api/borrowers/:id/transactions
///
/// Lists a borrower's transactions; 404 when the borrower is absent.
pub async fn list_borrower_transactions(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<i64>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let transactions = state.borrowers().transactions(borrower_id).await?;
    Ok(Json(transactions))
}

/// POST /api/borrowers/:id/transactions
///
/// Appends a transaction to a borrower.
pub async fn create_borrower_transaction(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<i64>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let transaction = state
        .borrowers()
        .add_transaction(borrower_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET /api/borrowers/:id/documents
///
/// Lists a borrower's documents; 404 when the borrower is absent.
pub async fn list_borrower_documents(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<i64>,
) -> Result<Json<Vec<Document>>, AppError> {
    let documents = state.borrowers().documents(borrower_id).await?;
    Ok(Json(documents))
}

/// POST /api/borrowers/:id/documents
///
/// Appends a document to a borrower.
pub async fn create_borrower_document(
    State(state): State<Arc<AppState>>,
    Path(borrower_id): Path<i64>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    let document = state.borrowers().add_document(borrower_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/regions
///
/// Lists all regions.
pub async fn list_regions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Region>>, AppError> {
    let regions = state.regions().list().await?;
    Ok(Json(regions))
}

/// DELETE /api/regions/:id
///
/// Administrative deletion. Borrowers in the region are preserved with a
/// nulled region reference.
pub async fn delete_region(
    State(state): State<Arc<AppState>>,
    Path(region_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("DELETE /api/regions/{}", region_id);
    let detached = state.regions().delete(region_id).await?;

    Ok(Json(json!({
        "success": true,
        "region_id": region_id,
        "borrowers_detached": detached
    })))
}

/// GET /api/stats/global
///
/// Portfolio-wide statistics; all-zero on an empty borrower set.
pub async fn global_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GlobalStats>, AppError> {
    let stats = state.portfolio().global_stats().await?;
    Ok(Json(stats))
}

/// GET /api/stats/regions
///
/// Per-region risk ranking, descending by high-risk percentage
/// (ties by ascending region id). Possibly empty.
pub async fn region_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RegionStat>>, AppError> {
    let stats = state.portfolio().region_stats().await?;
    Ok(Json(stats))
}
