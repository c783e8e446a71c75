use crate::errors::AppError;
use crate::models::{
    BorrowerRecord, CreateBorrowerRequest, CreateDocumentRequest, CreateTransactionRequest,
    Decision, Document, RiskLevel, Transaction,
};
use chrono::NaiveDate;
use phonenumber::Mode;
use regex::Regex;
use sqlx::PgPool;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

const BORROWER_COLUMNS: &str = "b.borrower_id, b.first_name, b.last_name, b.email, b.phone, \
     b.loan_amount, b.loan_date, b.decision, b.region_id, b.credit_score, b.risk_level, \
     b.probability_of_default, r.region_name, r.latitude, r.longitude";

/// Fields of a borrower ready for insertion, with region resolved and
/// scoring already performed (or absent).
#[derive(Debug, Clone)]
pub struct NewBorrower {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub loan_amount: Option<f64>,
    pub loan_date: NaiveDate,
    pub decision: Decision,
    pub region_id: Option<i64>,
    pub credit_score: Option<i32>,
    pub risk_level: Option<RiskLevel>,
    pub probability_of_default: Option<f64>,
}

/// Persistence operations over the borrower graph.
pub struct BorrowerStore {
    pool: PgPool,
}

impl BorrowerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a borrower and returns it joined with its region attributes.
    pub async fn insert(&self, borrower: NewBorrower) -> Result<BorrowerRecord, AppError> {
        let (borrower_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO borrowers (
                first_name, last_name, email, phone, loan_amount, loan_date,
                decision, region_id, credit_score, risk_level, probability_of_default
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING borrower_id
            "#,
        )
        .bind(&borrower.first_name)
        .bind(&borrower.last_name)
        .bind(&borrower.email)
        .bind(&borrower.phone)
        .bind(borrower.loan_amount)
        .bind(borrower.loan_date)
        .bind(borrower.decision)
        .bind(borrower.region_id)
        .bind(borrower.credit_score)
        .bind(borrower.risk_level)
        .bind(borrower.probability_of_default)
        .fetch_one(&self.pool)
        .await?;

        self.get(borrower_id).await
    }

    /// Fetches a borrower by id with denormalized region attributes.
    pub async fn get(&self, borrower_id: i64) -> Result<BorrowerRecord, AppError> {
        sqlx::query_as::<_, BorrowerRecord>(&format!(
            "SELECT {} FROM borrowers b
             LEFT JOIN regions r ON r.region_id = b.region_id
             WHERE b.borrower_id = $1",
            BORROWER_COLUMNS
        ))
        .bind(borrower_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrower with id {} not found", borrower_id)))
    }

    /// Lists borrowers in stable ascending-id order.
    ///
    /// Paging bounds are validated before any query is issued.
    pub async fn list(
        &self,
        skip: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<BorrowerRecord>, AppError> {
        let (skip, limit) = validate_page(skip, limit)?;

        let borrowers = sqlx::query_as::<_, BorrowerRecord>(&format!(
            "SELECT {} FROM borrowers b
             LEFT JOIN regions r ON r.region_id = b.region_id
             ORDER BY b.borrower_id ASC
             LIMIT $1 OFFSET $2",
            BORROWER_COLUMNS
        ))
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(borrowers)
    }

    /// Deletes a borrower; its transactions and documents go with it.
    ///
    /// Returns how many of each were removed by the cascade.
    pub async fn delete(&self, borrower_id: i64) -> Result<(i64, i64), AppError> {
        let (transactions, documents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM transactions WHERE borrower_id = $1),
                (SELECT COUNT(*) FROM documents WHERE borrower_id = $1)
            "#,
        )
        .bind(borrower_id)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query_as::<_, (i64,)>(
            "DELETE FROM borrowers WHERE borrower_id = $1 RETURNING borrower_id",
        )
        .bind(borrower_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrower with id {} not found", borrower_id)))?;

        tracing::info!(
            "Deleted borrower {} ({} transaction(s), {} document(s) cascaded)",
            borrower_id,
            transactions,
            documents
        );

        Ok((transactions, documents))
    }

    async fn ensure_exists(&self, borrower_id: i64) -> Result<(), AppError> {
        sqlx::query_as::<_, (i64,)>("SELECT borrower_id FROM borrowers WHERE borrower_id = $1")
            .bind(borrower_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Borrower with id {} not found", borrower_id))
            })?;
        Ok(())
    }

    /// Lists a borrower's transactions, oldest first.
    pub async fn transactions(&self, borrower_id: i64) -> Result<Vec<Transaction>, AppError> {
        self.ensure_exists(borrower_id).await?;

        let transactions = sqlx::query_as::<_, Transaction>(
            "SELECT transaction_id, borrower_id, transaction_date, amount, transaction_type
             FROM transactions WHERE borrower_id = $1
             ORDER BY transaction_id ASC",
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Appends a transaction to a borrower.
    pub async fn add_transaction(
        &self,
        borrower_id: i64,
        req: &CreateTransactionRequest,
    ) -> Result<Transaction, AppError> {
        if !req.amount.is_finite() {
            return Err(AppError::BadRequest(
                "amount must be a finite number".to_string(),
            ));
        }
        if req.transaction_type.trim().is_empty() {
            return Err(AppError::BadRequest(
                "transaction_type cannot be empty".to_string(),
            ));
        }
        self.ensure_exists(borrower_id).await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (borrower_id, transaction_date, amount, transaction_type)
            VALUES ($1, $2, $3, $4)
            RETURNING transaction_id, borrower_id, transaction_date, amount, transaction_type
            "#,
        )
        .bind(borrower_id)
        .bind(req.transaction_date)
        .bind(req.amount)
        .bind(&req.transaction_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Lists a borrower's documents, oldest first.
    pub async fn documents(&self, borrower_id: i64) -> Result<Vec<Document>, AppError> {
        self.ensure_exists(borrower_id).await?;

        let documents = sqlx::query_as::<_, Document>(
            "SELECT document_id, borrower_id, document_name, document_type, upload_date
             FROM documents WHERE borrower_id = $1
             ORDER BY document_id ASC",
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    /// Appends a document to a borrower.
    pub async fn add_document(
        &self,
        borrower_id: i64,
        req: &CreateDocumentRequest,
    ) -> Result<Document, AppError> {
        if req.document_name.trim().is_empty() {
            return Err(AppError::BadRequest(
                "document_name cannot be empty".to_string(),
            ));
        }
        if req.document_type.trim().is_empty() {
            return Err(AppError::BadRequest(
                "document_type cannot be empty".to_string(),
            ));
        }
        self.ensure_exists(borrower_id).await?;

        let upload_date = req
            .upload_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive());

        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (borrower_id, document_name, document_type, upload_date)
            VALUES ($1, $2, $3, $4)
            RETURNING document_id, borrower_id, document_name, document_type, upload_date
            "#,
        )
        .bind(borrower_id)
        .bind(&req.document_name)
        .bind(&req.document_type)
        .bind(upload_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(document)
    }
}

/// Validates pagination bounds before any query runs.
///
/// skip must be >= 0 and limit within 1..=1000; defaults are 0 and 100.
pub fn validate_page(skip: Option<i64>, limit: Option<i64>) -> Result<(i64, i64), AppError> {
    let skip = skip.unwrap_or(0);
    let limit = limit.unwrap_or(DEFAULT_LIMIT);

    if skip < 0 {
        return Err(AppError::BadRequest(format!(
            "skip must be >= 0, got {}",
            skip
        )));
    }
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, limit
        )));
    }

    Ok((skip, limit))
}

/// Validate email address
///
/// Checks for:
/// - Basic structure (contains @ and ., minimum length)
/// - RFC 5322 simplified format
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // RFC 5322 simplified email regex
    // Matches: local@domain.tld
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    if !email_regex.is_match(email) {
        tracing::debug!("Invalid email format: {}", email);
        return false;
    }

    true
}

/// Validate and normalize a phone number
///
/// Borrowers span countries, so numbers must arrive in international
/// format (+250788123456). Uses the phonenumber library to parse,
/// validate, and normalize to E.164.
///
/// Returns: (is_valid, normalized_phone_or_error_msg)
pub fn validate_phone(raw: &str) -> (bool, String) {
    if raw.trim().is_empty() || raw.len() < 8 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(None, raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("Valid phone: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                (false, format!("Invalid phone number: {}", raw))
            }
        }
        Err(e) => (false, format!("Unparseable phone number ({}): {}", e, raw)),
    }
}

/// Validates the caller-controlled fields of a borrower creation request.
pub fn validate_new_borrower(req: &CreateBorrowerRequest) -> Result<(), AppError> {
    if req.first_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "first_name cannot be empty".to_string(),
        ));
    }
    if req.last_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "last_name cannot be empty".to_string(),
        ));
    }
    if let Some(ref email) = req.email {
        if !is_valid_email(email) {
            return Err(AppError::BadRequest(format!("invalid email: {}", email)));
        }
    }
    if let Some(ref phone) = req.phone {
        let (valid, detail) = validate_phone(phone);
        if !valid {
            return Err(AppError::BadRequest(format!("invalid phone: {}", detail)));
        }
    }
    if let Some(amount) = req.loan_amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AppError::BadRequest(
                "loan_amount must be a non-negative finite number".to_string(),
            ));
        }
    }
    Ok(())
}
