//! Case module - case records, their evidence and the HTTP surface around them.

pub mod handlers;
pub mod models;

pub use models::{Attachment, Case, CaseFile, CaseSummary, Message, RiskLevel};
