use anyhow::{Context, Result};

use crate::auth::Credentials;

/// Application configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Server ──────────────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    /// Directory with the contact form page, served for any unrouted path.
    pub public_dir: String,

    // ── amoCRM ──────────────────────────────────────────────────────────
    /// Account base URL, e.g. `https://example.amocrm.ru` (no trailing slash).
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub redirect_uri: Option<String>,

    // ── Leads ───────────────────────────────────────────────────────────
    pub lead_name: String,
    pub lead_price: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("AMOCRM_BASE_URL")
            .context("AMOCRM_BASE_URL is required (e.g. https://example.amocrm.ru)")?;

        Ok(Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()
                .context("Invalid PORT")?,
            public_dir: std::env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".into()),

            base_url: normalize_base_url(&base_url)?,
            client_id: non_empty_var("INTEGRATION_ID"),
            client_secret: non_empty_var("SECRET_KEY"),
            refresh_token: non_empty_var("REFRESH_TOKEN"),
            redirect_uri: non_empty_var("REDIRECT_URI"),

            lead_name: std::env::var("LEAD_NAME").unwrap_or_else(|_| "Сделка".into()),
            lead_price: std::env::var("LEAD_PRICE")
                .unwrap_or_else(|_| "1000".into())
                .parse()
                .context("Invalid LEAD_PRICE")?,
        })
    }

    /// OAuth client credentials, if every part is configured.
    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            client_id: self.client_id.clone()?,
            client_secret: self.client_secret.clone()?,
            refresh_token: self.refresh_token.clone()?,
            redirect_uri: self.redirect_uri.clone()?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw.trim()).context("Invalid AMOCRM_BASE_URL")?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("AMOCRM_BASE_URL must be an http(s) URL, got {raw}");
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
