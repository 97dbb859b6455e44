use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;

/// Application configuration loaded from environment variables.
/// Every setting has a default, so a bare `cargo run` serves a local SQLite file.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Zone used when rendering timestamps in exports. Stored values stay UTC.
    pub display_tz: Tz,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: env_or("DATABASE_URL", "sqlite://jobtrackr.sqlite"),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            display_tz: parse_timezone(&env_or("DISPLAY_TIMEZONE", "Europe/Lisbon"))?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parses an IANA zone name such as `Europe/Lisbon` or `UTC`.
pub fn parse_timezone(raw: &str) -> Result<Tz> {
    let raw = raw.trim();
    raw.parse::<Tz>()
        .map_err(|e| anyhow!("DISPLAY_TIMEZONE '{raw}' is not a known IANA zone: {e}"))
}
