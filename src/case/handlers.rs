use actix_web::{http::header, web, HttpResponse, Responder};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::bundle::merger::is_document_filename;
use crate::bundle::{BundleAssembler, BundleError};
use crate::case::models::{Attachment, Case, CaseFile, CaseSummary, Message};
use crate::db::{AppState, StoreError};
use crate::drafting::{prompt, Provider};
use crate::storage::EvidenceFetcher;
use crate::ErrorResponse;

pub const MERGED_HEADER: &str = "X-Merged-Attachments";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BundleRequest {
    /// Provider key such as `gemini` or `deepseek`; the server default when absent.
    #[schema(example = "gemini")]
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConsultRequest {
    #[schema(example = "claude")]
    pub provider: Option<String>,
    #[schema(example = "Has the 14 day deadline passed?")]
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConsultResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderInfo {
    pub key: &'static str,
    pub display_name: &'static str,
    pub configured: bool,
    pub default: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentInfo {
    pub id: i32,
    #[schema(example = "invoice.pdf")]
    pub filename: String,
    pub locator: Option<String>,
    pub cloud_linked: bool,
    /// Whether the attachment would be appended to a bundle if fetchable.
    pub mergeable: bool,
}

impl From<Attachment> for AttachmentInfo {
    fn from(attachment: Attachment) -> Self {
        let cloud_linked = attachment.is_cloud_linked();
        let mergeable = cloud_linked && is_document_filename(&attachment.filename);
        Self {
            id: attachment.id,
            filename: attachment.filename,
            locator: attachment.locator,
            cloud_linked,
            mergeable,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CaseDetail {
    pub case: Case,
    pub messages: Vec<Message>,
    pub attachments: Vec<AttachmentInfo>,
}

impl From<CaseFile> for CaseDetail {
    fn from(case_file: CaseFile) -> Self {
        Self {
            case: case_file.case,
            messages: case_file.messages,
            attachments: case_file.attachments.into_iter().map(AttachmentInfo::from).collect(),
        }
    }
}

fn resolve_provider(state: &AppState, requested: Option<&str>) -> Result<Provider, HttpResponse> {
    match requested {
        None => Ok(state.default_provider),
        Some(key) => key.parse::<Provider>().map_err(|e| {
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string()))
        }),
    }
}

fn store_error_response(e: StoreError) -> HttpResponse {
    match e {
        StoreError::CaseNotFound(id) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found(&format!("Case {} not found", id)))
        }
        StoreError::Database(e) => {
            error!("Case store query failed: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to read case data"))
        }
    }
}

/// An empty body selects the default provider; anything else must be a valid `BundleRequest`.
fn parse_bundle_request(body: &[u8]) -> Result<BundleRequest, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BundleRequest::default());
    }
    serde_json::from_slice(body)
}

async fn load_case_file(state: &AppState, id: i32) -> Result<CaseFile, HttpResponse> {
    state.cases.load_case(id).await.map_err(store_error_response)
}

#[utoipa::path(
    get,
    path = "/api/providers",
    tag = "Drafting",
    responses(
        (status = 200, description = "Drafting providers and whether each has a key", body = Vec<ProviderInfo>)
    )
)]
pub async fn list_providers(state: web::Data<AppState>) -> impl Responder {
    let providers: Vec<ProviderInfo> = Provider::ALL
        .into_iter()
        .map(|p| ProviderInfo {
            key: p.key(),
            display_name: p.display_name(),
            configured: state.drafting.is_configured(p),
            default: p == state.default_provider,
        })
        .collect();
    HttpResponse::Ok().json(providers)
}

#[utoipa::path(
    get,
    path = "/api/cases",
    tag = "Cases",
    responses(
        (status = 200, description = "All cases ordered by id", body = Vec<CaseSummary>),
        (status = 500, description = "Case store failure", body = ErrorResponse)
    )
)]
pub async fn list_cases(state: web::Data<AppState>) -> impl Responder {
    match state.cases.list_cases().await {
        Ok(cases) => {
            let summaries: Vec<CaseSummary> = cases.iter().map(CaseSummary::from).collect();
            HttpResponse::Ok().json(summaries)
        }
        Err(e) => store_error_response(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    tag = "Cases",
    params(
        ("id" = i32, Path, description = "Case ID")
    ),
    responses(
        (status = 200, description = "Case with messages and attachments", body = CaseDetail),
        (status = 404, description = "Case not found", body = ErrorResponse)
    )
)]
pub async fn get_case(state: web::Data<AppState>, path: web::Path<i32>) -> impl Responder {
    match load_case_file(&state, path.into_inner()).await {
        Ok(case_file) => HttpResponse::Ok().json(CaseDetail::from(case_file)),
        Err(response) => response,
    }
}

#[utoipa::path(
    post,
    path = "/api/cases/{id}/bundle",
    tag = "Cases",
    params(
        ("id" = i32, Path, description = "Case ID")
    ),
    request_body = BundleRequest,
    responses(
        (status = 200, description = "Merged demand bundle", content_type = "application/pdf"),
        (status = 400, description = "Unknown provider", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse),
        (status = 500, description = "Base document could not be rendered", body = ErrorResponse)
    )
)]
pub async fn generate_bundle(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Bytes,
) -> impl Responder {
    let request = match parse_bundle_request(&body) {
        Ok(r) => r,
        Err(e) => {
            warn!("Rejected bundle request body: {}", e);
            return HttpResponse::BadRequest()
                .json(ErrorResponse::bad_request(&format!("Invalid request body: {}", e)));
        }
    };
    let provider = match resolve_provider(&state, request.provider.as_deref()) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let case_file = match load_case_file(&state, path.into_inner()).await {
        Ok(c) => c,
        Err(response) => return response,
    };

    info!(
        "Drafting bundle for case {} with {}",
        case_file.case.id, provider
    );
    let context = prompt::evidence_context(&case_file.messages);
    let draft = state
        .drafting
        .draft(provider, &prompt::letter_prompt(&case_file.case, &context))
        .await;

    let assembler = BundleAssembler::new(
        &state.composer,
        state.renderer.clone(),
        EvidenceFetcher::new(state.storage.as_ref()),
    );

    match assembler.assemble(&case_file, &draft).await {
        Ok(bundle) => HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", bundle.filename),
            ))
            .insert_header((MERGED_HEADER, bundle.merged.to_string()))
            .body(bundle.pdf),
        Err(BundleError::Render(e)) => {
            error!("Rendering bundle for case {} failed: {}", case_file.case.id, e);
            HttpResponse::InternalServerError().json(ErrorResponse::new("RenderError", &e.to_string()))
        }
        Err(e) => {
            error!("Assembling bundle for case {} failed: {}", case_file.case.id, e);
            HttpResponse::InternalServerError().json(ErrorResponse::internal_error(&e.to_string()))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/cases/{id}/consult",
    tag = "Cases",
    params(
        ("id" = i32, Path, description = "Case ID")
    ),
    request_body = ConsultRequest,
    responses(
        (status = 200, description = "Model answer", body = ConsultResponse),
        (status = 400, description = "Unknown provider or empty question", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    )
)]
pub async fn consult(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<ConsultRequest>,
) -> impl Responder {
    let request = body.into_inner();
    if request.question.trim().is_empty() {
        warn!("Rejected consultation with empty question");
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request("Question must not be empty"));
    }
    let provider = match resolve_provider(&state, request.provider.as_deref()) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let case_file = match load_case_file(&state, path.into_inner()).await {
        Ok(c) => c,
        Err(response) => return response,
    };

    let context = prompt::evidence_context(&case_file.messages);
    let answer = state
        .drafting
        .draft(
            provider,
            &prompt::consult_prompt(&case_file.case, &context, &request.question),
        )
        .await;

    HttpResponse::Ok().json(ConsultResponse { answer })
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/providers").route(web::get().to(list_providers)))
        .service(web::resource("/cases").route(web::get().to(list_cases)))
        .service(web::resource("/cases/{id}").route(web::get().to(get_case)))
        .service(web::resource("/cases/{id}/bundle").route(web::post().to(generate_bundle)))
        .service(web::resource("/cases/{id}/consult").route(web::post().to(consult)));
}
