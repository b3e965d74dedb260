use anyhow::{Context, Result};
use chrono_tz::Tz;

/// Zone every instant is rendered in unless `DISPLAY_TIMEZONE` overrides it.
pub const DEFAULT_DISPLAY_TIMEZONE: &str = "America/Mexico_City";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Fixed zone used only for rendering, never for storage.
    pub display_timezone: Tz,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("PORT", "3000")
                .parse()
                .context("PORT must be a valid port number")?,
            display_timezone: parse_timezone(&optional(
                "DISPLAY_TIMEZONE",
                DEFAULT_DISPLAY_TIMEZONE,
            ))?,
        })
    }
}

/// Parse an IANA zone name such as `"America/Mexico_City"`.
pub fn parse_timezone(raw: &str) -> Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("DISPLAY_TIMEZONE must be an IANA zone name, got {raw:?}: {e}"))
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
