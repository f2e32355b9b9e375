//! amoCRM integration: REST client, the `CrmApi` seam, and the form pipeline.

pub mod client;
pub mod pipeline;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::AmoClient;
pub use pipeline::{ContactForm, LeadTemplate, Plan};
pub use traits::{CrmApi, Outcome};
pub use types::{Contact, Lead};
