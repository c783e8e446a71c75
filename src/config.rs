use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub model_path: String,
    pub geocode_base_url: String,
    pub geocode_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "models/credit_model.json".to_string()),
            geocode_base_url: std::env::var("GEOCODE_BASE_URL")
                .unwrap_or_else(|_| "https://geocoding-api.open-meteo.com".to_string())
                .parse::<url::Url>()
                .map_err(|e| anyhow::anyhow!("GEOCODE_BASE_URL is not a valid URL: {}", e))
                .and_then(|url| {
                    if url.scheme() != "http" && url.scheme() != "https" {
                        anyhow::bail!("GEOCODE_BASE_URL must start with http:// or https://");
                    }
                    // Keep the string form; trailing slashes break path joining
                    Ok(url.as_str().trim_end_matches('/').to_string())
                })?,
            geocode_timeout_ms: std::env::var("GEOCODE_TIMEOUT_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GEOCODE_TIMEOUT_MS must be a positive integer"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Model path: {}", config.model_path);
        tracing::debug!("Geocode base URL: {}", config.geocode_base_url);
        tracing::debug!("Geocode timeout: {}ms", config.geocode_timeout_ms);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
