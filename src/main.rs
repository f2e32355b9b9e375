use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use amocrm_bridge::auth::TokenManager;
use amocrm_bridge::crm::AmoClient;
use amocrm_bridge::{api, AppState, Config, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amocrm_bridge=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("amocrm-bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("amoCRM account: {}", config.base_url);

    let http = reqwest::Client::new();
    let tokens = Arc::new(TokenManager::new(
        &config.base_url,
        config.credentials(),
        http.clone(),
    ));

    // Warm the token so the first form submission doesn't pay for the grant.
    if tokens.has_credentials() {
        match tokens.refresh().await {
            Ok(token) => info!(expires_at = token.expires_at, "amoCRM token obtained ✓"),
            Err(e) => warn!("Initial amoCRM token refresh failed: {e}. Will retry on first request."),
        }
    } else {
        warn!(
            "amoCRM credentials incomplete (INTEGRATION_ID, SECRET_KEY, REFRESH_TOKEN, REDIRECT_URI). \
             /contacts will answer 503 until they are set."
        );
    }

    let crm = Arc::new(AmoClient::new(&config.base_url, tokens.clone(), http));

    let state: SharedState = Arc::new(AppState {
        config: config.clone(),
        tokens,
        crm,
    });

    let app = api::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
