use std::env;
use std::time::Duration;

use anyhow::Context;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_SECS: u64 = 3_600;

/// Server configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub token_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
        let jwt_secret = env::var("STUDYFLOW_JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("STUDYFLOW_JWT_SECRET is not set"))?;
        let bind_addr =
            env::var("STUDYFLOW_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let token_ttl = match env::var("STUDYFLOW_TOKEN_TTL_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .context("STUDYFLOW_TOKEN_TTL_SECS must be a number of seconds")?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            token_ttl,
        })
    }
}
