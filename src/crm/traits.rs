use async_trait::async_trait;

use super::types::{Contact, Lead};
use crate::error::CrmError;

/// Result of a CRM call that can legitimately produce nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Value(T),
    /// The CRM answered, but with no matching entity.
    Empty,
    /// No access token was available, so no request was made.
    NoToken,
}

impl<T> Outcome<T> {
    /// Collapse into an optional value, turning `NoToken` into an error.
    pub fn into_option(self) -> Result<Option<T>, CrmError> {
        match self {
            Outcome::Value(v) => Ok(Some(v)),
            Outcome::Empty => Ok(None),
            Outcome::NoToken => Err(CrmError::NoToken),
        }
    }

    /// Like [`Outcome::into_option`], but an empty answer is also an error.
    pub fn required(self, entity: &'static str) -> Result<T, CrmError> {
        self.into_option()?.ok_or(CrmError::MissingEntity(entity))
    }
}

/// The contact and lead operations the form pipeline needs from the CRM.
///
/// Every implementation ensures a valid token before each call and reports
/// a missing token as [`Outcome::NoToken`] rather than failing.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// First contact matching the phone number, if any.
    async fn find_contact_by_phone(&self, phone: &str) -> Result<Outcome<Contact>, CrmError>;

    /// First contact matching the email address, if any.
    async fn find_contact_by_email(&self, email: &str) -> Result<Outcome<Contact>, CrmError>;

    async fn create_contact(
        &self,
        name: &str,
        phone: &str,
        email: &str,
    ) -> Result<Outcome<Contact>, CrmError>;

    /// Overwrite name, phone and email on an existing contact.
    async fn update_contact(
        &self,
        id: u64,
        name: &str,
        phone: &str,
        email: &str,
    ) -> Result<Outcome<Contact>, CrmError>;

    /// Create a lead linked to `contact_id`; returns the leads the CRM created.
    async fn create_lead(
        &self,
        contact_id: u64,
        name: &str,
        price: u64,
    ) -> Result<Outcome<Vec<Lead>>, CrmError>;
}
