pub mod api;
pub mod auth;
pub mod config;
pub mod crm;
pub mod error;

pub use config::Config;
pub use error::CrmError;

use std::sync::Arc;

/// Shared application state passed to all API handlers.
pub struct AppState {
    pub config: Config,
    pub tokens: Arc<auth::TokenManager>,
    pub crm: Arc<dyn crm::CrmApi>,
}

pub type SharedState = Arc<AppState>;
