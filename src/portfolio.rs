use crate::errors::{AppError, ResultExt};
use crate::models::{GlobalStats, RegionRiskRow, RegionStat};
use crate::scoring::round2;
use sqlx::PgPool;

/// Read-only aggregate queries over the borrower graph.
///
/// Canonical definitions are the risk-oriented ones: credit-score average
/// and high-risk counts globally, high-risk percentage ranking per region.
/// Queries run under read-committed isolation and need not observe writes
/// still in flight.
pub struct PortfolioService {
    pool: PgPool,
}

impl PortfolioService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Portfolio-wide statistics.
    ///
    /// Zero borrowers yields an all-zero result; no division happens here
    /// (the score average is SQL AVG over scored borrowers, NULL when
    /// there are none).
    pub async fn global_stats(&self) -> Result<GlobalStats, AppError> {
        let (total_borrowers, average_credit_score, high_risk_count): (i64, Option<f64>, i64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*),
                       AVG(credit_score)::float8,
                       COUNT(*) FILTER (WHERE risk_level = 'High')
                FROM borrowers
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .context("computing global portfolio statistics")?;

        Ok(GlobalStats {
            total_borrowers,
            average_credit_score: round2(average_credit_score.unwrap_or(0.0)),
            high_risk_count,
        })
    }

    /// Per-region risk ranking.
    ///
    /// A borrower qualifies once it has a computed risk tier; regions with
    /// no qualifying borrowers are absent from the result. Ordering is
    /// descending by high-risk percentage with ascending region_id as the
    /// deterministic tie-break.
    pub async fn region_stats(&self) -> Result<Vec<RegionStat>, AppError> {
        let rows = sqlx::query_as::<_, RegionRiskRow>(
            r#"
            SELECT b.region_id, r.region_name,
                   COUNT(*) AS total_borrowers,
                   COUNT(*) FILTER (WHERE b.risk_level = 'High') AS high_risk_count
            FROM borrowers b
            JOIN regions r ON r.region_id = b.region_id
            WHERE b.risk_level IS NOT NULL
            GROUP BY b.region_id, r.region_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("aggregating per-region risk counts")?;

        Ok(rank_regions(rows))
    }
}

/// Ranks raw per-region aggregation rows.
///
/// Pure: computes the 2-decimal high-risk percentage and sorts descending
/// by it, breaking ties by ascending region_id. Every input row has at
/// least one qualifying borrower, so the division is always defined.
pub fn rank_regions(rows: Vec<RegionRiskRow>) -> Vec<RegionStat> {
    let mut stats: Vec<RegionStat> = rows
        .into_iter()
        .map(|row| {
            let percentage = (row.high_risk_count as f64 / row.total_borrowers as f64) * 100.0;
            RegionStat {
                region_id: row.region_id,
                region_name: row.region_name,
                total_borrowers: row.total_borrowers,
                high_risk_count: row.high_risk_count,
                high_risk_percentage: round2(percentage),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.high_risk_percentage
            .total_cmp(&a.high_risk_percentage)
            .then_with(|| a.region_id.cmp(&b.region_id))
    });

    stats
}
