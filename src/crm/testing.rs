//! In-memory `CrmApi` double that records every call.

use async_trait::async_trait;
use serde_json::Map;
use std::sync::Mutex;

use super::traits::{CrmApi, Outcome};
use super::types::{Contact, Lead};
use crate::error::CrmError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FindByPhone(String),
    FindByEmail(String),
    Create(String, String, String),
    Update(u64, String, String, String),
    CreateLead(u64, String, u64),
}

#[derive(Default)]
pub struct FakeCrm {
    phone_hit: Option<u64>,
    email_hit: Option<u64>,
    created_id: Option<u64>,
    fail_leads: bool,
    no_token: bool,
    calls: Mutex<Vec<Call>>,
}

pub fn contact(id: u64) -> Contact {
    Contact {
        id,
        name: None,
        custom_fields_values: None,
        extra: Map::new(),
    }
}

impl FakeCrm {
    pub fn with_phone_hit(mut self, id: u64) -> Self {
        self.phone_hit = Some(id);
        self
    }

    pub fn with_email_hit(mut self, id: u64) -> Self {
        self.email_hit = Some(id);
        self
    }

    pub fn with_created_id(mut self, id: u64) -> Self {
        self.created_id = Some(id);
        self
    }

    pub fn failing_leads(mut self) -> Self {
        self.fail_leads = true;
        self
    }

    pub fn without_token(mut self) -> Self {
        self.no_token = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn lookup(&self, hit: Option<u64>) -> Outcome<Contact> {
        if self.no_token {
            return Outcome::NoToken;
        }
        hit.map_or(Outcome::Empty, |id| Outcome::Value(contact(id)))
    }
}

#[async_trait]
impl CrmApi for FakeCrm {
    async fn find_contact_by_phone(&self, phone: &str) -> Result<Outcome<Contact>, CrmError> {
        self.record(Call::FindByPhone(phone.into()));
        Ok(self.lookup(self.phone_hit))
    }

    async fn find_contact_by_email(&self, email: &str) -> Result<Outcome<Contact>, CrmError> {
        self.record(Call::FindByEmail(email.into()));
        Ok(self.lookup(self.email_hit))
    }

    async fn create_contact(
        &self,
        name: &str,
        phone: &str,
        email: &str,
    ) -> Result<Outcome<Contact>, CrmError> {
        self.record(Call::Create(name.into(), phone.into(), email.into()));
        Ok(self.lookup(Some(self.created_id.unwrap_or(1))))
    }

    async fn update_contact(
        &self,
        id: u64,
        name: &str,
        phone: &str,
        email: &str,
    ) -> Result<Outcome<Contact>, CrmError> {
        self.record(Call::Update(id, name.into(), phone.into(), email.into()));
        Ok(self.lookup(Some(id)))
    }

    async fn create_lead(
        &self,
        contact_id: u64,
        name: &str,
        price: u64,
    ) -> Result<Outcome<Vec<Lead>>, CrmError> {
        self.record(Call::CreateLead(contact_id, name.into(), price));
        if self.fail_leads {
            return Err(CrmError::Api {
                operation: "lead create",
                status: 400,
                body: "rejected".into(),
            });
        }
        Ok(Outcome::Value(vec![Lead {
            id: 1000 + contact_id,
            extra: Map::new(),
        }]))
    }
}
