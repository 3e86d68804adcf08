use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub db_connect_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DB_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .context("DB_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(4000);
        let token_ttl_days = env::var("JWT_TTL_DAYS")
            .ok()
            .and_then(|d| d.parse::<i64>().ok())
            .filter(|d| *d > 0)
            .unwrap_or(7);
        let db_connect_attempts = env::var("DB_CONNECT_ATTEMPTS")
            .ok()
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(5)
            .max(1);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            token_ttl_days,
            db_connect_attempts,
        })
    }
}
