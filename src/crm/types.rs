use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FIELD_CODE_PHONE: &str = "PHONE";
pub const FIELD_CODE_EMAIL: &str = "EMAIL";

/// A contact as returned by `/api/v4/contacts`.
///
/// Only the fields this service reads are typed; everything else the CRM
/// sends is kept in `extra` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields_values: Option<Vec<CustomField>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contact {
    pub fn phone(&self) -> Option<&str> {
        self.field_value(FIELD_CODE_PHONE)
    }

    pub fn email(&self) -> Option<&str> {
        self.field_value(FIELD_CODE_EMAIL)
    }

    fn field_value(&self, code: &str) -> Option<&str> {
        self.custom_fields_values
            .as_deref()?
            .iter()
            .find(|f| f.field_code.as_deref() == Some(code))?
            .values
            .first()?
            .value
            .as_str()
    }
}

/// A lead as returned by `/api/v4/leads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_code: Option<String>,
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

impl CustomField {
    fn single(code: &str, value: &str) -> Self {
        Self {
            field_id: None,
            field_code: Some(code.to_string()),
            values: vec![FieldValue {
                value: Value::String(value.to_string()),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────────────────────────

/// Contact payload for create (no id) and update (with id).
#[derive(Debug, Serialize)]
pub struct ContactPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub custom_fields_values: Vec<CustomField>,
}

impl ContactPayload {
    pub fn new(id: Option<u64>, name: &str, phone: &str, email: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            custom_fields_values: vec![
                CustomField::single(FIELD_CODE_PHONE, phone),
                CustomField::single(FIELD_CODE_EMAIL, email),
            ],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeadPayload {
    pub name: String,
    pub price: u64,
    #[serde(rename = "_embedded")]
    pub embedded: LeadLinks,
}

#[derive(Debug, Serialize)]
pub struct LeadLinks {
    pub contacts: Vec<ContactRef>,
}

#[derive(Debug, Serialize)]
pub struct ContactRef {
    pub id: u64,
}

impl LeadPayload {
    pub fn new(contact_id: u64, name: &str, price: u64) -> Self {
        Self {
            name: name.to_string(),
            price,
            embedded: LeadLinks {
                contacts: vec![ContactRef { id: contact_id }],
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// HAL-style `{"_embedded": {...}}` wrapper used by list and batch endpoints.
#[derive(Debug, Deserialize)]
pub struct Embedded<T> {
    #[serde(rename = "_embedded")]
    pub embedded: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct ContactList {
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Deserialize)]
pub struct LeadList {
    #[serde(default)]
    pub leads: Vec<Lead>,
}
