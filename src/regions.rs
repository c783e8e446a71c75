use crate::errors::AppError;
use crate::geocode::{Coordinates, GeocodeClient};
use crate::models::Region;
use moka::future::Cache;
use sqlx::PgPool;

/// Get-or-create of named regions for borrower onboarding.
///
/// Name matching is exact and case-sensitive. Coordinates are best-effort:
/// caller-supplied pairs win over stored values (last-write-wins), unseen
/// names are geocoded with a null-coordinate fallback, and the
/// lookup-then-insert sequence is closed against concurrent callers by the
/// unique name constraint plus an upsert.
pub struct RegionService {
    pool: PgPool,
    cache: Cache<String, Region>,
    geocoder: Option<GeocodeClient>,
}

impl RegionService {
    pub fn new(
        pool: PgPool,
        cache: Cache<String, Region>,
        geocoder: Option<GeocodeClient>,
    ) -> Self {
        Self {
            pool,
            cache,
            geocoder,
        }
    }

    /// Resolves a region by name, creating it when unseen.
    ///
    /// Caller coordinates are applied only when both latitude and
    /// longitude are present; a lone half of the pair is ignored.
    pub async fn resolve_or_create(
        &self,
        name: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Region, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest(
                "region_name cannot be empty".to_string(),
            ));
        }

        let caller_coords = match (latitude, longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates {
                latitude: lat,
                longitude: lon,
            }),
            _ => None,
        };

        // Cache fast path is only valid when the caller is not overwriting
        // coordinates.
        if caller_coords.is_none() {
            if let Some(region) = self.cache.get(name).await {
                tracing::debug!("Region cache HIT for '{}'", name);
                return Ok(region);
            }
        }

        let existing = sqlx::query_as::<_, Region>(
            "SELECT region_id, region_name, latitude, longitude
             FROM regions WHERE region_name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let region = match existing {
            Some(region) => {
                if let Some(coords) = caller_coords {
                    // Last-write-wins overwrite, no merging with stored values
                    sqlx::query_as::<_, Region>(
                        "UPDATE regions SET latitude = $2, longitude = $3
                         WHERE region_id = $1
                         RETURNING region_id, region_name, latitude, longitude",
                    )
                    .bind(region.region_id)
                    .bind(coords.latitude)
                    .bind(coords.longitude)
                    .fetch_one(&self.pool)
                    .await?
                } else {
                    region
                }
            }
            None => {
                let coords = match caller_coords {
                    Some(coords) => Some(coords),
                    None => self.geocode_best_effort(name).await,
                };

                // Atomic upsert: concurrent creators of the same unseen name
                // collide on the unique constraint instead of producing
                // duplicate rows, and everyone gets the surviving row back.
                sqlx::query_as::<_, Region>(
                    r#"
                    INSERT INTO regions (region_name, latitude, longitude)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (region_name) DO UPDATE
                    SET latitude = COALESCE(EXCLUDED.latitude, regions.latitude),
                        longitude = COALESCE(EXCLUDED.longitude, regions.longitude)
                    RETURNING region_id, region_name, latitude, longitude
                    "#,
                )
                .bind(name)
                .bind(coords.map(|c| c.latitude))
                .bind(coords.map(|c| c.longitude))
                .fetch_one(&self.pool)
                .await?
            }
        };

        self.cache.insert(name.to_string(), region.clone()).await;

        Ok(region)
    }

    /// Geocodes an unseen name, degrading to no coordinates on any failure.
    ///
    /// Geocoding unavailability is never surfaced to the caller; the region
    /// is created without coordinates instead.
    async fn geocode_best_effort(&self, name: &str) -> Option<Coordinates> {
        let geocoder = self.geocoder.as_ref()?;
        match geocoder.lookup(name).await {
            Ok(coords) => coords,
            Err(e) => {
                tracing::warn!(
                    "Geocoding unavailable for '{}', creating region without coordinates: {}",
                    name,
                    e
                );
                None
            }
        }
    }

    /// Lists all regions ordered by id.
    pub async fn list(&self) -> Result<Vec<Region>, AppError> {
        let regions = sqlx::query_as::<_, Region>(
            "SELECT region_id, region_name, latitude, longitude
             FROM regions ORDER BY region_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(regions)
    }

    /// Deletes a region by id.
    ///
    /// Borrowers referencing it survive with a nulled region_id (enforced
    /// by the schema's ON DELETE SET NULL). Returns the number of
    /// borrowers that were detached.
    pub async fn delete(&self, region_id: i64) -> Result<i64, AppError> {
        let (detached,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM borrowers WHERE region_id = $1")
                .bind(region_id)
                .fetch_one(&self.pool)
                .await?;

        let deleted = sqlx::query_as::<_, (String,)>(
            "DELETE FROM regions WHERE region_id = $1 RETURNING region_name",
        )
        .bind(region_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Region with id {} not found", region_id)))?;

        self.cache.invalidate(&deleted.0).await;

        tracing::info!(
            "Deleted region {} ('{}'), detached {} borrower(s)",
            region_id,
            deleted.0,
            detached
        );

        Ok(detached)
    }
}
