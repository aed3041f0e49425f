use actix_cors::Cors;
use actix_web::middleware::{Compress, Logger};
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod bundle;
pub mod case;
pub mod config;
pub mod db;
pub mod drafting;
pub mod storage;

pub use crate::db::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::case::handlers::list_providers,
        crate::case::handlers::list_cases,
        crate::case::handlers::get_case,
        crate::case::handlers::generate_bundle,
        crate::case::handlers::consult
    ),
    components(
        schemas(
            case::models::Case,
            case::models::Message,
            case::models::Attachment,
            case::models::CaseFile,
            case::models::CaseSummary,
            case::handlers::AttachmentInfo,
            case::handlers::CaseDetail,
            case::handlers::BundleRequest,
            case::handlers::ConsultRequest,
            case::handlers::ConsultResponse,
            case::handlers::ProviderInfo,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Cases", description = "Case browsing, bundle generation and consultation."),
        (name = "Drafting", description = "Language model providers.")
    )
)]
pub struct ApiDoc;

/// Register the API routes, OpenAPI docs included.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api").configure(case::handlers::config))
        .service(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()),
        );
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app_config = config::AppConfig::from_env().context("invalid configuration")?;
    let bind_address = app_config.bind_address.clone();

    let app_state = match AppState::new_with_config(&app_config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialise application state. Please check DATABASE_URL in .env and ensure the database is running. Error: {}", e);
            anyhow::bail!("startup failed: {e}");
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("demand_bundle_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create Prometheus metrics middleware: {e}"))?;

    log::info!("Starting server at http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![
                header::CONTENT_DISPOSITION,
                header::HeaderName::from_static("x-merged-attachments"),
            ])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind(&bind_address)
    .with_context(|| format!("failed to bind {bind_address}"))?
    .run()
    .await
    .context("server error")
}
