//! Route handlers. All handlers receive `SharedState` via Axum state extraction.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::crm::{pipeline, ContactForm, Lead, LeadTemplate};
use crate::error::CrmError;
use crate::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/contacts", get(submit_contact))
        .with_state(state)
}

async fn status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "amocrm-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "credentials_configured": state.tokens.has_credentials(),
    }))
}

/// GET /contacts?name=&phone=&email= — find or create the contact, then open
/// a lead for it. Responds with the leads amoCRM created.
async fn submit_contact(
    State(state): State<SharedState>,
    Query(form): Query<ContactForm>,
) -> Result<Json<Vec<Lead>>, CrmError> {
    let template = LeadTemplate {
        name: state.config.lead_name.clone(),
        price: state.config.lead_price,
    };
    let leads = pipeline::submit(state.crm.as_ref(), &form, &template).await?;
    Ok(Json(leads))
}
