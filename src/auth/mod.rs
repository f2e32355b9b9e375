//! OAuth token handling for the amoCRM integration.

pub mod token;

pub use token::{Credentials, TokenManager, TokenSet, TokenState, REFRESH_MARGIN_SECS};
