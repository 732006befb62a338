use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Descriptive client identifier the catalog asks callers to send.
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub provider: ProviderConfig,
    pub search_cache_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutrilog".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nutrilog-users".into()),
        };
        let provider = ProviderConfig {
            base_url: std::env::var("FOOD_PROVIDER_URL")
                .unwrap_or_else(|_| "https://world.openfoodfacts.org".into()),
            user_agent: std::env::var("FOOD_PROVIDER_USER_AGENT")
                .unwrap_or_else(|_| "nutrilog/0.1 (food journal backend)".into()),
            timeout_secs: std::env::var("FOOD_PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5),
        };
        let search_cache_ttl_secs = std::env::var("SEARCH_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(crate::cache::DEFAULT_TTL.as_secs());
        Ok(Self {
            database_url,
            jwt,
            provider,
            search_cache_ttl_secs,
        })
    }
}
