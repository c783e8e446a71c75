use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde::Serializer;
use sqlx::FromRow;

// ============ Database Models ============

/// Outcome of a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "decision")]
pub enum Decision {
    Pending,
    Approved,
    Denied,
}

/// Coarse risk tier derived from the credit score.
///
/// Never stored independently of the score: both are produced by one
/// scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "risk_level")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// A named geographic grouping of borrowers.
///
/// `region_name` is the business key used for get-or-create; coordinates
/// are optional and best-effort (geocoded or caller-supplied).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Region {
    /// Surrogate key.
    pub region_id: i64,
    /// Unique region name (case-sensitive business key).
    pub region_name: String,
    /// Latitude, if known.
    pub latitude: Option<f64>,
    /// Longitude, if known.
    pub longitude: Option<f64>,
}

/// A borrower joined with its region's denormalized attributes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BorrowerRecord {
    /// Surrogate key.
    pub borrower_id: i64,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address.
    pub email: Option<String>,
    /// Phone number (E.164).
    pub phone: Option<String>,
    /// Requested or granted loan amount.
    pub loan_amount: Option<f64>,
    /// Date of the loan application.
    pub loan_date: NaiveDate,
    /// Application decision.
    pub decision: Decision,
    /// Region reference; nulled when the region is deleted.
    pub region_id: Option<i64>,
    /// Credit score derived from the probability of default.
    pub credit_score: Option<i32>,
    /// Risk tier derived from the credit score.
    pub risk_level: Option<RiskLevel>,
    /// Model probability of default, unrounded in storage.
    #[serde(serialize_with = "round2_opt")]
    pub probability_of_default: Option<f64>,
    /// Region name, when the borrower belongs to one.
    pub region_name: Option<String>,
    /// Region latitude, when known.
    pub latitude: Option<f64>,
    /// Region longitude, when known.
    pub longitude: Option<f64>,
}

/// A transaction owned by a borrower; deleted with it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: i64,
    pub borrower_id: i64,
    pub transaction_date: NaiveDate,
    pub amount: f64,
    pub transaction_type: String,
}

/// A document owned by a borrower; deleted with it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub document_id: i64,
    pub borrower_id: i64,
    pub document_name: String,
    pub document_type: String,
    pub upload_date: NaiveDate,
}

// ============ API Request/Response Models ============

/// The fixed, named feature vector consumed by the scoring model.
///
/// The shape is a contract with the pre-trained artifact; adding or
/// removing fields requires retraining.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Credit limit.
    pub limit_bal: f64,
    /// Borrower age in years.
    pub age: f64,
    /// Average payment delay across recent billing cycles.
    pub avg_pay_delay: f64,
    /// Balance over credit limit.
    pub credit_utilization: f64,
    /// Payments over billed amounts.
    pub payment_ratio: f64,
}

/// Response payload for the scoring endpoint.
///
/// Field names mirror the established client contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    /// Probability of default, rounded to 2 decimals.
    #[serde(rename = "PD")]
    pub pd: f64,
    #[serde(rename = "Credit_Score")]
    pub credit_score: i32,
    #[serde(rename = "Risk_Level")]
    pub risk_level: RiskLevel,
}

/// Request payload for creating a borrower.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBorrowerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub loan_amount: Option<f64>,
    /// Defaults to today when omitted.
    pub loan_date: Option<NaiveDate>,
    /// Defaults to `Pending` when omitted.
    pub decision: Option<Decision>,
    /// Region to resolve or create for this borrower.
    pub region_name: Option<String>,
    /// Caller-supplied region latitude; only applied together with longitude.
    pub latitude: Option<f64>,
    /// Caller-supplied region longitude; only applied together with latitude.
    pub longitude: Option<f64>,
    /// When present, the borrower is persisted already scored.
    pub features: Option<FeatureVector>,
}

/// Request payload for appending a transaction to a borrower.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionRequest {
    pub transaction_date: NaiveDate,
    pub amount: f64,
    pub transaction_type: String,
}

/// Request payload for appending a document to a borrower.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocumentRequest {
    pub document_name: String,
    pub document_type: String,
    /// Defaults to today when omitted.
    pub upload_date: Option<NaiveDate>,
}

/// Query parameters for the paginated borrower listing.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListParams {
    /// Number of records to skip (default 0).
    pub skip: Option<i64>,
    /// Maximum number of records to return (default 100, max 1000).
    pub limit: Option<i64>,
}

// ============ Aggregate Models ============

/// Portfolio-wide statistics.
///
/// All-zero when the borrower set is empty; the average covers only
/// borrowers that have a computed score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_borrowers: i64,
    pub average_credit_score: f64,
    pub high_risk_count: i64,
}

/// Raw per-region aggregation row, before ranking.
#[derive(Debug, Clone, FromRow)]
pub struct RegionRiskRow {
    pub region_id: i64,
    pub region_name: String,
    pub total_borrowers: i64,
    pub high_risk_count: i64,
}

/// A ranked per-region risk entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStat {
    pub region_id: i64,
    pub region_name: String,
    pub total_borrowers: i64,
    pub high_risk_count: i64,
    /// Share of high-risk borrowers among scored ones, rounded to 2 decimals.
    pub high_risk_percentage: f64,
}

/// Serializes an optional probability rounded to 2 decimal places.
///
/// Stored probabilities stay unrounded; rounding happens only at the
/// serialization boundary.
pub fn round2_opt<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) => serializer.serialize_some(&((v * 100.0).round() / 100.0)),
        None => serializer.serialize_none(),
    }
}
