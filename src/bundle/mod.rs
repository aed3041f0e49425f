//! Bundle module - assembly of legal-demand bundles.
//!
//! The pipeline runs leaf-first through these submodules:
//! - `markup` - translates drafted text into the presentational markup subset
//! - `composer` - lays out the letter and evidence schedule as Typst source
//! - `engine` - compiles Typst source into PDF bytes
//! - `merger` - appends cloud-hosted PDF attachments to the composed document

pub mod common;
pub mod composer;
pub mod engine;
pub mod markup;
pub mod merger;
pub mod traits;

pub use composer::{DemandBundleComposer, EVIDENCE_BODY_LIMIT};
pub use engine::TypstRenderEngine;
pub use merger::{AttachmentOutcome, PdfMerger, SkipReason};
pub use traits::DocumentRenderer;

use std::sync::Arc;

use actix_web::web;
use thiserror::Error;

use crate::case::models::CaseFile;
use crate::storage::EvidenceFetcher;

/// Errors raised while turning the composed layout into a PDF.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load Typst template: {0}")]
    TemplateIo(#[source] std::io::Error),
    #[error("malformed markup at byte {position}: {message}")]
    Markup { position: usize, message: String },
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed to write Typst source: {0}")]
    WriteTypst(#[source] std::io::Error),
    #[error("Typst CLI execution failed: {0}")]
    TypstIo(#[source] std::io::Error),
    #[error("Typst CLI exited with status {code}: {stderr}")]
    TypstExit { code: i32, stderr: String },
    #[error("failed to read generated PDF: {0}")]
    ReadPdf(#[source] std::io::Error),
    #[error("render worker failed: {0}")]
    Blocking(String),
}

/// Fatal errors of a bundle request. Attachment-level failures never end up here.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("composed document is not a readable PDF: {0}")]
    BaseDocument(#[source] lopdf::Error),
    #[error("failed to write merged PDF: {0}")]
    Write(#[source] lopdf::Error),
}

/// The merged output of one bundle request.
#[derive(Debug)]
pub struct Bundle {
    pub filename: String,
    pub pdf: Vec<u8>,
    /// Number of attachments whose pages were appended.
    pub merged: usize,
    /// One entry per attachment, in the case's listing order.
    pub outcomes: Vec<(String, AttachmentOutcome)>,
}

/// Runs the full pipeline for one case: compose, then merge eligible attachments.
pub struct BundleAssembler<'a> {
    composer: &'a DemandBundleComposer,
    renderer: Arc<dyn DocumentRenderer>,
    fetcher: EvidenceFetcher<'a>,
}

impl<'a> BundleAssembler<'a> {
    pub fn new(
        composer: &'a DemandBundleComposer,
        renderer: Arc<dyn DocumentRenderer>,
        fetcher: EvidenceFetcher<'a>,
    ) -> Self {
        Self {
            composer,
            renderer,
            fetcher,
        }
    }

    /// Build the bundle. `draft` is the raw drafting-service text; it is
    /// translated here exactly once.
    pub async fn assemble(&self, case_file: &CaseFile, draft: &str) -> Result<Bundle, BundleError> {
        let translated = markup::translate(draft);
        let source = self
            .composer
            .compose(&case_file.case, &case_file.messages, &translated)?;
        // Rendering shells out and blocks; keep it off the request worker.
        let renderer = Arc::clone(&self.renderer);
        let base = web::block(move || renderer.render(&source))
            .await
            .map_err(|e| RenderError::Blocking(e.to_string()))??;
        log::debug!(
            "composed base document for case {} ({} bytes)",
            case_file.case.id,
            base.len()
        );

        let mut merger = PdfMerger::new(&base).map_err(BundleError::BaseDocument)?;
        let mut outcomes = Vec::with_capacity(case_file.attachments.len());

        for attachment in &case_file.attachments {
            let outcome = merger.merge_attachment(attachment, &self.fetcher).await;
            match &outcome {
                AttachmentOutcome::Merged { pages } => {
                    log::info!("merged {} ({} pages)", attachment.filename, pages)
                }
                AttachmentOutcome::Skipped(reason) => {
                    log::warn!("skipped {}: {}", attachment.filename, reason)
                }
            }
            outcomes.push((attachment.filename.clone(), outcome));
        }

        let merged = merger.merged_count();
        let pdf = merger.finish().map_err(BundleError::Write)?;
        log::info!(
            "bundle for case {} ready: {} attachment(s) merged, {} bytes",
            case_file.case.id,
            merged,
            pdf.len()
        );

        Ok(Bundle {
            filename: common::bundle_filename(&case_file.case.title),
            pdf,
            merged,
            outcomes,
        })
    }
}
