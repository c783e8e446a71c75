//! Script to seed the database with demo regions and borrowers.

use credit_risk_api::scoring::score_from_probability;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;

/// Main entry point for the seeding script.
///
/// Connects to the database, runs migrations, and inserts three regions
/// plus a handful of borrowers. Skips seeding when regions already exist,
/// so repeated runs are harmless.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    // Database connection
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    // Check if data already exists
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM regions")
        .fetch_one(&pool)
        .await?;
    if existing > 0 {
        tracing::info!("Database already seeded ({} regions). Skipping.", existing);
        return Ok(());
    }

    let regions = [
        ("Rwanda", Some((-1.9403, 29.8739))),
        ("Kenya", Some((-0.0236, 37.9062))),
        ("Uganda", None),
    ];

    let mut region_ids = Vec::new();
    for (name, coords) in regions {
        let (region_id,): (i64,) = sqlx::query_as(
            "INSERT INTO regions (region_name, latitude, longitude)
             VALUES ($1, $2, $3) RETURNING region_id",
        )
        .bind(name)
        .bind(coords.map(|c| c.0))
        .bind(coords.map(|c| c.1))
        .fetch_one(&pool)
        .await?;
        region_ids.push(region_id);
    }

    // (name pair, email, phone, loan amount, loan date, decision, region index, PD)
    let borrowers = [
        (
            ("Jean", "Uwimana"),
            "jean.uwimana@example.com",
            "+250788123456",
            5000.0,
            "2024-01-15",
            "Approved",
            0usize,
            Some(0.08),
        ),
        (
            ("Grace", "Mutesi"),
            "grace.mutesi@example.com",
            "+250788234567",
            3000.0,
            "2024-02-10",
            "Pending",
            0,
            Some(0.35),
        ),
        (
            ("Patrick", "Nkunda"),
            "patrick.nkunda@example.com",
            "+250788345678",
            7500.0,
            "2024-01-20",
            "Denied",
            0,
            Some(0.61),
        ),
        (
            ("Amina", "Odhiambo"),
            "amina.odhiambo@example.com",
            "+254712345678",
            4200.0,
            "2024-03-05",
            "Approved",
            1,
            Some(0.15),
        ),
        (
            ("Samuel", "Okello"),
            "samuel.okello@example.com",
            "+256772123456",
            2600.0,
            "2024-03-18",
            "Pending",
            2,
            None,
        ),
    ];

    for ((first, last), email, phone, amount, date, decision, region_idx, pd) in borrowers {
        // Derive score fields from the probability so seeded rows respect
        // the same formula the service applies.
        let scored = pd.map(score_from_probability);

        sqlx::query(
            r#"
            INSERT INTO borrowers (
                first_name, last_name, email, phone, loan_amount, loan_date,
                decision, region_id, credit_score, risk_level, probability_of_default
            )
            VALUES ($1, $2, $3, $4, $5, $6::date, $7::decision, $8, $9, $10, $11)
            "#,
        )
        .bind(first)
        .bind(last)
        .bind(email)
        .bind(phone)
        .bind(amount)
        .bind(date)
        .bind(decision)
        .bind(region_ids[region_idx])
        .bind(scored.map(|s| s.0))
        .bind(scored.map(|s| s.1))
        .bind(pd)
        .execute(&pool)
        .await?;
    }

    tracing::info!("Database seeded successfully!");
    tracing::info!("  - {} regions created", region_ids.len());
    tracing::info!("  - {} borrowers created", borrowers.len());

    Ok(())
}
