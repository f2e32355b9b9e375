//! amoCRM OAuth token manager.
//!
//! Holds the single access/refresh token pair for the account and refreshes
//! it proactively once it is within [`REFRESH_MARGIN_SECS`] of expiry.
//! Refreshes are single-flight: the state mutex is held across the expiry
//! check and the grant, so concurrent callers wait for one refresh instead of
//! racing their own.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::CrmError;

/// Refresh when fewer than this many seconds of token lifetime remain.
pub const REFRESH_MARGIN_SECS: i64 = 3600;

/// Static OAuth client credentials for the amoCRM integration.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    /// Refresh token used before the first successful grant.
    pub refresh_token: String,
    pub redirect_uri: String,
}

/// The token pair currently held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl TokenState {
    fn needs_refresh(&self, now: i64) -> bool {
        self.access_token.is_empty() || self.expires_at.saturating_sub(now) < REFRESH_MARGIN_SECS
    }

    fn usable_access_token(&self) -> Option<String> {
        (!self.access_token.is_empty()).then(|| self.access_token.clone())
    }
}

/// Body of the `refresh_token` grant.
#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    refresh_token: &'a str,
    redirect_uri: &'a str,
}

/// Tokens returned by `/oauth2/access_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

pub struct TokenManager {
    token_url: String,
    credentials: Option<Credentials>,
    http: reqwest::Client,
    state: Mutex<Option<TokenState>>,
}

impl TokenManager {
    /// Create a manager for the account at `base_url`. Without credentials the
    /// manager never refreshes and every caller gets "no token".
    pub fn new(base_url: &str, credentials: Option<Credentials>, http: reqwest::Client) -> Self {
        Self {
            token_url: format!("{}/oauth2/access_token", base_url.trim_end_matches('/')),
            credentials,
            http,
            state: Mutex::new(None),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Return an access token valid for at least the refresh margin,
    /// refreshing first if needed. `Ok(None)` means no token is available
    /// (no credentials configured, or the CRM granted an empty token).
    pub async fn ensure_valid(&self) -> Result<Option<String>, CrmError> {
        let mut state = self.state.lock().await;
        let now = Utc::now().timestamp();

        if let Some(current) = state.as_ref() {
            if !current.needs_refresh(now) {
                return Ok(current.usable_access_token());
            }
            debug!(
                expires_in = current.expires_at.saturating_sub(now),
                "amoCRM token near expiry, refreshing"
            );
        }

        let Some(credentials) = &self.credentials else {
            debug!("No amoCRM credentials configured, skipping refresh");
            return Ok(None);
        };

        let refreshed = self.grant(credentials, state.as_ref()).await?;
        let token = refreshed.usable_access_token();
        if token.is_none() {
            warn!("amoCRM granted an empty access token");
        }
        *state = Some(refreshed);
        Ok(token)
    }

    /// Unconditionally exchange the refresh token for a new pair.
    pub async fn refresh(&self) -> Result<TokenState, CrmError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| CrmError::Auth("amoCRM credentials are not configured".into()))?;

        let mut state = self.state.lock().await;
        let refreshed = self.grant(credentials, state.as_ref()).await?;
        *state = Some(refreshed.clone());
        Ok(refreshed)
    }

    /// Copy of the token pair currently held.
    pub async fn snapshot(&self) -> Option<TokenState> {
        self.state.lock().await.clone()
    }

    /// Install a token pair directly, replacing whatever is held.
    pub async fn seed(&self, token: TokenState) {
        *self.state.lock().await = Some(token);
    }

    async fn grant(
        &self,
        credentials: &Credentials,
        current: Option<&TokenState>,
    ) -> Result<TokenState, CrmError> {
        // amoCRM rotates the refresh token on every grant.
        let refresh_token = current
            .map(|s| s.refresh_token.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(credentials.refresh_token.as_str());

        let body = RefreshGrant {
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
            grant_type: "refresh_token",
            refresh_token,
            redirect_uri: &credentials.redirect_uri,
        };

        let resp = self
            .http
            .post(&self.token_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CrmError::Auth(format!("Token refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CrmError::Auth(format!(
                "amoCRM rejected token refresh ({status}): {body}"
            )));
        }

        let tokens: TokenSet = resp
            .json()
            .await
            .map_err(|e| CrmError::Auth(format!("Failed to parse token response: {e}")))?;

        if tokens.expires_in <= 0 {
            return Err(CrmError::Auth(format!(
                "amoCRM granted a token with non-positive lifetime: {}",
                tokens.expires_in
            )));
        }
        let expires_at = Utc::now().timestamp().saturating_add(tokens.expires_in);
        info!(expires_at, "Refreshed amoCRM access token");

        Ok(TokenState {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
        })
    }
}
