use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Default credential lifetime in days.
    /// Set via NEWSFLOW_DEFAULT_EXPIRY_DAYS. Default: 365.
    pub default_expiry_days: i64,
    /// Default daily request ceiling per credential.
    /// Set via NEWSFLOW_DEFAULT_RATE_LIMIT. Default: 1000.
    pub default_rate_limit: i64,
    /// Comma-separated origins allowed by CORS (dashboard hosts).
    pub allowed_origins: Vec<String>,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    Ok(Config {
        port: parse_port(std::env::var("NEWSFLOW_PORT").ok())?,
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/newsflow".into()),
        default_expiry_days: std::env::var("NEWSFLOW_DEFAULT_EXPIRY_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(365),
        default_rate_limit: std::env::var("NEWSFLOW_DEFAULT_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000),
        allowed_origins: std::env::var("NEWSFLOW_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    })
}

/// A set but unparseable NEWSFLOW_PORT is a startup error, not a silent
/// fallback to the default.
fn parse_port(raw: Option<String>) -> anyhow::Result<u16> {
    match raw {
        None => Ok(8080),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("NEWSFLOW_PORT is not a valid port: {v:?}")),
    }
}
