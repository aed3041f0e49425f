//! Database module - AppState and the case store
//!
//! - `case` - case, message and attachment queries

mod case;

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::bundle::{DemandBundleComposer, DocumentRenderer, TypstRenderEngine};
use crate::case::models::{Case, CaseFile};
use crate::config::AppConfig;
use crate::drafting::{DraftingService, HttpDraftingClient, Provider};
use crate::storage::{GcsStorage, ObjectStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("case {0} not found")]
    CaseNotFound(i32),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read access to cases and their evidence.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// All cases ordered by id.
    async fn list_cases(&self) -> Result<Vec<Case>, StoreError>;

    /// One case with its messages (ascending by sent time) and attachments.
    async fn load_case(&self, id: i32) -> Result<CaseFile, StoreError>;
}

pub struct PgCaseStore {
    pool: PgPool,
}

impl PgCaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(900))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }
}

/// Shared collaborators handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub cases: Arc<dyn CaseStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub drafting: Arc<dyn DraftingService>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub composer: Arc<DemandBundleComposer>,
    pub default_provider: Provider,
}

impl AppState {
    pub async fn new_with_config(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let cases = PgCaseStore::connect(&config.database_url).await?;

        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(900))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let storage = GcsStorage::new(config.storage.clone(), http_client.clone());
        let drafting = HttpDraftingClient::new(
            http_client,
            config.credentials.clone(),
            config.http_timeout_secs,
        );
        let composer = DemandBundleComposer::new()?.with_signature(config.signature.clone());

        Ok(Self::from_parts(
            Arc::new(cases),
            Arc::new(storage),
            Arc::new(drafting),
            Arc::new(TypstRenderEngine::with_binary(config.typst_binary.clone())),
            composer,
            config.default_provider,
        ))
    }

    pub fn from_parts(
        cases: Arc<dyn CaseStore>,
        storage: Arc<dyn ObjectStore>,
        drafting: Arc<dyn DraftingService>,
        renderer: Arc<dyn DocumentRenderer>,
        composer: DemandBundleComposer,
        default_provider: Provider,
    ) -> Self {
        Self {
            cases,
            storage,
            drafting,
            renderer,
            composer: Arc::new(composer),
            default_provider,
        }
    }
}
