//! Drafting module - letter drafting through hosted language models.
//!
//! - `providers` - the enumerated provider table and its credentials
//! - `client` - HTTP clients for the provider APIs
//! - `prompt` - prompt assembly from case facts and correspondence

pub mod client;
pub mod prompt;
pub mod providers;

pub use client::HttpDraftingClient;
pub use providers::{ApiFlavor, Provider, ProviderConfig, ProviderCredentials};

use async_trait::async_trait;
use thiserror::Error;

/// Draft text returned when the selected provider has no credential configured.
pub const MISSING_KEY_MESSAGE: &str = "Error: API Key not found! Check secrets.";

#[derive(Debug, Error)]
pub enum DraftingError {
    #[error("no API key configured for {0}")]
    MissingKey(&'static str),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected response format: {0}")]
    UnexpectedResponse(String),
}

impl DraftingError {
    /// The text placed in the document instead of a draft.
    pub fn to_draft_text(&self) -> String {
        match self {
            Self::MissingKey(_) => MISSING_KEY_MESSAGE.to_string(),
            other => format!("Brain Error: {other}"),
        }
    }
}

/// Produces draft text for a prompt.
///
/// Failures are folded into the returned text; callers render whatever comes back.
#[async_trait]
pub trait DraftingService: Send + Sync {
    async fn draft(&self, provider: Provider, prompt: &str) -> String;

    /// Whether a credential is available for `provider`.
    fn is_configured(&self, provider: Provider) -> bool;
}
