//! Contact form → CRM lead pipeline.
//!
//! Decision table, evaluated once per request:
//!
//! | phone search | email search | plan            |
//! |--------------|--------------|-----------------|
//! | hit          | (skipped)    | `Update(hit)`   |
//! | miss         | hit          | `Update(hit)`   |
//! | miss         | miss         | `Create`        |
//!
//! Either plan ends with exactly one lead linked to the resulting contact.
//! The first error aborts the pipeline and nothing partial is returned.

use serde::Deserialize;
use tracing::info;

use super::traits::CrmApi;
use super::types::{Contact, Lead};
use crate::error::CrmError;

/// Fields submitted by the contact form.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl ContactForm {
    fn validate(&self) -> Result<(), CrmError> {
        for (field, value) in [("name", &self.name), ("phone", &self.phone), ("email", &self.email)] {
            if value.trim().is_empty() {
                return Err(CrmError::BadRequest(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Name and price given to every lead opened from the form.
#[derive(Debug, Clone)]
pub struct LeadTemplate {
    pub name: String,
    pub price: u64,
}

/// What to do with the contact before opening the lead.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Update(Contact),
    Create,
}

/// Search by phone, then by email, and decide between update and create.
pub async fn plan(crm: &dyn CrmApi, form: &ContactForm) -> Result<Plan, CrmError> {
    if let Some(contact) = crm.find_contact_by_phone(&form.phone).await?.into_option()? {
        return Ok(Plan::Update(contact));
    }
    if let Some(contact) = crm.find_contact_by_email(&form.email).await?.into_option()? {
        return Ok(Plan::Update(contact));
    }
    Ok(Plan::Create)
}

/// Run the whole pipeline and return the leads the CRM created.
pub async fn submit(
    crm: &dyn CrmApi,
    form: &ContactForm,
    lead: &LeadTemplate,
) -> Result<Vec<Lead>, CrmError> {
    form.validate()?;

    let contact = match plan(crm, form).await? {
        Plan::Update(existing) => {
            info!(
                contact_id = existing.id,
                previous_phone = existing.phone().unwrap_or_default(),
                previous_email = existing.email().unwrap_or_default(),
                "Updating existing amoCRM contact"
            );
            crm.update_contact(existing.id, &form.name, &form.phone, &form.email)
                .await?
                .required("contact")?
        }
        Plan::Create => {
            let created = crm
                .create_contact(&form.name, &form.phone, &form.email)
                .await?
                .required("contact")?;
            info!(contact_id = created.id, "Created amoCRM contact");
            created
        }
    };

    let leads = crm
        .create_lead(contact.id, &lead.name, lead.price)
        .await?
        .required("lead")?;
    info!(contact_id = contact.id, leads = leads.len(), "Opened amoCRM lead");
    Ok(leads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::testing::{Call, FakeCrm};
    use crate::crm::Outcome;

    fn form() -> ContactForm {
        ContactForm {
            name: "Test".into(),
            phone: "+79990000000".into(),
            email: "a@b.com".into(),
        }
    }

    fn template() -> LeadTemplate {
        LeadTemplate {
            name: "Сделка".into(),
            price: 1000,
        }
    }

    #[tokio::test]
    async fn test_phone_hit_updates_then_opens_lead() {
        let crm = FakeCrm::default().with_phone_hit(42);

        let leads = submit(&crm, &form(), &template()).await.unwrap();

        assert_eq!(leads.len(), 1);
        assert_eq!(
            crm.calls(),
            vec![
                Call::FindByPhone("+79990000000".into()),
                Call::Update(42, "Test".into(), "+79990000000".into(), "a@b.com".into()),
                Call::CreateLead(42, "Сделка".into(), 1000),
            ]
        );
    }

    #[tokio::test]
    async fn test_email_hit_updates_that_contact() {
        let crm = FakeCrm::default().with_email_hit(77);

        submit(&crm, &form(), &template()).await.unwrap();

        let calls = crm.calls();
        assert_eq!(calls[0], Call::FindByPhone("+79990000000".into()));
        assert_eq!(calls[1], Call::FindByEmail("a@b.com".into()));
        assert!(matches!(calls[2], Call::Update(77, ..)));
        assert_eq!(calls[3], Call::CreateLead(77, "Сделка".into(), 1000));
        assert!(!calls.iter().any(|c| matches!(c, Call::Create(..))));
    }

    #[tokio::test]
    async fn test_no_match_creates_then_opens_lead() {
        let crm = FakeCrm::default().with_created_id(900);

        submit(&crm, &form(), &template()).await.unwrap();

        assert_eq!(
            crm.calls(),
            vec![
                Call::FindByPhone("+79990000000".into()),
                Call::FindByEmail("a@b.com".into()),
                Call::Create("Test".into(), "+79990000000".into(), "a@b.com".into()),
                Call::CreateLead(900, "Сделка".into(), 1000),
            ]
        );
    }

    #[tokio::test]
    async fn test_lead_failure_returns_no_partial_result() {
        let crm = FakeCrm::default().with_phone_hit(42).failing_leads();

        let err = submit(&crm, &form(), &template()).await.unwrap_err();

        assert!(matches!(err, CrmError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_missing_token_is_explicit_error() {
        let crm = FakeCrm::default().without_token();

        let err = submit(&crm, &form(), &template()).await.unwrap_err();

        assert!(matches!(err, CrmError::NoToken));
        assert_eq!(crm.calls(), vec![Call::FindByPhone("+79990000000".into())]);
    }

    #[tokio::test]
    async fn test_blank_field_is_rejected_before_any_call() {
        let crm = FakeCrm::default();
        let mut blank = form();
        blank.email = "  ".into();

        let err = submit(&crm, &blank, &template()).await.unwrap_err();

        assert!(matches!(err, CrmError::BadRequest(ref msg) if msg.contains("email")));
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_plan_prefers_phone_match() {
        let crm = FakeCrm::default().with_phone_hit(1).with_email_hit(2);

        match plan(&crm, &form()).await.unwrap() {
            Plan::Update(contact) => assert_eq!(contact.id, 1),
            Plan::Create => panic!("expected update plan"),
        }
        assert_eq!(crm.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_plan_outcome_types_line_up() {
        // Empty search answers are not errors.
        let crm = FakeCrm::default();
        assert_eq!(
            crm.find_contact_by_phone("+1").await.unwrap(),
            Outcome::Empty
        );
        assert_eq!(plan(&crm, &form()).await.unwrap(), Plan::Create);
    }

    mod over_http {
        use super::*;
        use crate::auth::{TokenManager, TokenState};
        use crate::crm::AmoClient;
        use serde_json::json;
        use std::sync::Arc;
        use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn client(server: &MockServer) -> AmoClient {
            let tokens = Arc::new(TokenManager::new(&server.uri(), None, reqwest::Client::new()));
            tokens
                .seed(TokenState {
                    access_token: "t".into(),
                    refresh_token: "r".into(),
                    expires_at: chrono::Utc::now().timestamp() + 86400,
                })
                .await;
            AmoClient::new(&server.uri(), tokens, reqwest::Client::new())
        }

        #[tokio::test]
        async fn test_existing_phone_contact_end_to_end() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/v4/contacts"))
                .and(query_param("query", "+79990000000"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "_embedded": { "contacts": [{ "id": 42, "name": "Old" }] }
                })))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/api/v4/contacts"))
                .respond_with(ResponseTemplate::new(500))
                .expect(0)
                .mount(&server)
                .await;
            Mock::given(method("PATCH"))
                .and(path("/api/v4/contacts/42"))
                .and(body_json(json!({
                    "id": 42,
                    "name": "Test",
                    "custom_fields_values": [
                        { "field_code": "PHONE", "values": [{ "value": "+79990000000" }] },
                        { "field_code": "EMAIL", "values": [{ "value": "a@b.com" }] }
                    ]
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 42 })))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/api/v4/leads"))
                .and(body_partial_json(json!([{
                    "name": "Сделка",
                    "price": 1000,
                    "_embedded": { "contacts": [{ "id": 42 }] }
                }])))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "_links": { "self": { "href": "https://example.amocrm.ru/api/v4/leads" } },
                    "_embedded": { "leads": [{ "id": 3001, "request_id": "0" }] }
                })))
                .expect(1)
                .mount(&server)
                .await;

            let crm = client(&server).await;
            let leads = submit(&crm, &form(), &template()).await.unwrap();

            assert_eq!(leads.len(), 1);
            assert_eq!(leads[0].id, 3001);
            assert_eq!(leads[0].extra["request_id"], "0");
        }

        #[tokio::test]
        async fn test_lead_http_error_surfaces() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/v4/contacts"))
                .respond_with(ResponseTemplate::new(204))
                .expect(2)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/api/v4/contacts"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "_embedded": { "contacts": [{ "id": 55 }] }
                })))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/api/v4/leads"))
                .respond_with(ResponseTemplate::new(402).set_body_string("payment required"))
                .expect(1)
                .mount(&server)
                .await;

            let crm = client(&server).await;
            let err = submit(&crm, &form(), &template()).await.unwrap_err();

            assert!(matches!(err, CrmError::Api { status: 402, .. }));
        }
    }
}
