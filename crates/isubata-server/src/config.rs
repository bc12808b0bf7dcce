use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Recent-message cache lives in redis when set, in process otherwise.
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub icons_dir: PathBuf,
    pub unread_delay: Duration,
    pub store_fallback: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: var_or("ISUBATA_HOST", "0.0.0.0"),
            port: var_or("ISUBATA_PORT", "8080")
                .parse()
                .context("ISUBATA_PORT must be a port number")?,
            db_path: var_or("ISUBATA_DB_PATH", "isubata.db").into(),
            redis_url: std::env::var("ISUBATA_REDIS_URL").ok().filter(|v| !v.is_empty()),
            jwt_secret: var_or("ISUBATA_JWT_SECRET", "dev-secret-change-me"),
            icons_dir: var_or("ISUBATA_ICONS_DIR", "./public/icons").into(),
            unread_delay: Duration::from_millis(
                var_or("ISUBATA_UNREAD_DELAY_MS", "1000")
                    .parse()
                    .context("ISUBATA_UNREAD_DELAY_MS must be milliseconds")?,
            ),
            store_fallback: var_or("ISUBATA_STORE_FALLBACK", "true")
                .parse()
                .context("ISUBATA_STORE_FALLBACK must be true or false")?,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}
