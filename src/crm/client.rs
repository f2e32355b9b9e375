use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use super::traits::{CrmApi, Outcome};
use super::types::{Contact, ContactList, ContactPayload, Embedded, Lead, LeadList, LeadPayload};
use crate::auth::TokenManager;
use crate::error::CrmError;

/// amoCRM REST v4 client.
///
/// Quirks:
/// - Search answers `204 No Content` when nothing matches.
/// - Create endpoints take an array and answer with an `_embedded` batch.
/// - PATCH on a single contact answers with a bare contact object.
pub struct AmoClient {
    base_url: String,
    tokens: Arc<TokenManager>,
    http: reqwest::Client,
}

/// Fetch a valid access token or bail out of the calling operation with
/// `Outcome::NoToken`.
macro_rules! access_token {
    ($self:ident) => {
        match $self.tokens.ensure_valid().await? {
            Some(token) => token,
            None => {
                debug!("No amoCRM access token, skipping request");
                return Ok(Outcome::NoToken);
            }
        }
    };
}

impl AmoClient {
    pub fn new(base_url: &str, tokens: Arc<TokenManager>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v4/{}", self.base_url, path)
    }

    async fn find_contact(&self, query: &str) -> Result<Outcome<Contact>, CrmError> {
        let token = access_token!(self);

        let request = self
            .http
            .get(self.url("contacts"))
            .query(&[("query", query)])
            .bearer_auth(token);

        let page: Option<Embedded<ContactList>> = send(request, "contact search").await?;
        Ok(first_or_empty(
            page.and_then(|p| p.embedded).map(|e| e.contacts),
        ))
    }
}

#[async_trait]
impl CrmApi for AmoClient {
    async fn find_contact_by_phone(&self, phone: &str) -> Result<Outcome<Contact>, CrmError> {
        self.find_contact(phone).await
    }

    async fn find_contact_by_email(&self, email: &str) -> Result<Outcome<Contact>, CrmError> {
        self.find_contact(email).await
    }

    async fn create_contact(
        &self,
        name: &str,
        phone: &str,
        email: &str,
    ) -> Result<Outcome<Contact>, CrmError> {
        let token = access_token!(self);

        let body = [ContactPayload::new(None, name, phone, email)];
        let request = self
            .http
            .post(self.url("contacts"))
            .bearer_auth(token)
            .json(&body);

        let created: Option<Embedded<ContactList>> = send(request, "contact create").await?;
        Ok(first_or_empty(
            created.and_then(|c| c.embedded).map(|e| e.contacts),
        ))
    }

    async fn update_contact(
        &self,
        id: u64,
        name: &str,
        phone: &str,
        email: &str,
    ) -> Result<Outcome<Contact>, CrmError> {
        let token = access_token!(self);

        let body = ContactPayload::new(Some(id), name, phone, email);
        let request = self
            .http
            .patch(self.url(&format!("contacts/{id}")))
            .bearer_auth(token)
            .json(&body);

        let updated: Option<Contact> = send(request, "contact update").await?;
        Ok(updated.map_or(Outcome::Empty, Outcome::Value))
    }

    async fn create_lead(
        &self,
        contact_id: u64,
        name: &str,
        price: u64,
    ) -> Result<Outcome<Vec<Lead>>, CrmError> {
        let token = access_token!(self);

        let body = [LeadPayload::new(contact_id, name, price)];
        let request = self
            .http
            .post(self.url("leads"))
            .bearer_auth(token)
            .json(&body);

        let created: Option<Embedded<LeadList>> = send(request, "lead create").await?;
        Ok(match created.and_then(|c| c.embedded) {
            Some(list) => Outcome::Value(list.leads),
            None => Outcome::Empty,
        })
    }
}

/// Send a CRM request. `Ok(None)` for `204 No Content`, an `Api` error for
/// any other non-2xx status.
async fn send<T: DeserializeOwned>(
    request: RequestBuilder,
    operation: &'static str,
) -> Result<Option<T>, CrmError> {
    let resp = request
        .send()
        .await
        .map_err(|e| CrmError::Transport(format!("{operation}: {e}")))?;

    let status = resp.status();
    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!("amoCRM {operation} failed ({status}): {body}");
        return Err(CrmError::Api {
            operation,
            status: status.as_u16(),
            body,
        });
    }

    resp.json::<T>()
        .await
        .map(Some)
        .map_err(|e| CrmError::Decode(format!("{operation}: {e}")))
}

fn first_or_empty(contacts: Option<Vec<Contact>>) -> Outcome<Contact> {
    match contacts.and_then(|c| c.into_iter().next()) {
        Some(contact) => Outcome::Value(contact),
        None => Outcome::Empty,
    }
}
