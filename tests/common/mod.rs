#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::ThreadId;

use async_trait::async_trait;
use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

use demand_bundle_server::bundle::{DocumentRenderer, RenderError};
use demand_bundle_server::case::models::{Attachment, Case, CaseFile, Message, RiskLevel};
use demand_bundle_server::db::{CaseStore, StoreError};
use demand_bundle_server::drafting::{DraftingService, Provider};
use demand_bundle_server::storage::{ObjectStore, StorageError};

/// Build a small PDF with one page per entry of `page_texts`.
pub fn sample_pdf(page_texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 595.into(), 842.into()]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

/// Decoded content of every page, in page order.
pub fn page_contents(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
        .collect()
}

/// Renderer that skips Typst and emits a two-page "BASE" PDF, keeping the source it was given.
#[derive(Default)]
pub struct FakeRenderer {
    pub sources: Mutex<Vec<String>>,
    pub threads: Mutex<Vec<ThreadId>>,
}

impl FakeRenderer {
    pub fn last_source(&self) -> String {
        self.sources.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl DocumentRenderer for FakeRenderer {
    fn render(&self, typst_source: &str) -> Result<Vec<u8>, RenderError> {
        self.sources.lock().unwrap().push(typst_source.to_string());
        self.threads.lock().unwrap().push(std::thread::current().id());
        Ok(sample_pdf(&["BASE letter", "BASE evidence"]))
    }
}

pub struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    fn render(&self, _typst_source: &str) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::TypstExit {
            code: 1,
            stderr: "error: unexpected argument".to_string(),
        })
    }
}

/// In-memory object store counting download calls.
#[derive(Default)]
pub struct MockObjectStore {
    objects: HashMap<(String, String), Vec<u8>>,
    calls: AtomicUsize,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, bucket: &str, object: &str, data: Vec<u8>) -> Self {
        self.objects
            .insert((bucket.to_string(), object.to_string()), data);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(&(bucket.to_string(), object.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            })
    }
}

/// Object store whose every download fails at the transport level.
#[derive(Default)]
pub struct UnreachableObjectStore {
    calls: AtomicUsize,
}

impl UnreachableObjectStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for UnreachableObjectStore {
    async fn download(&self, _bucket: &str, _object: &str) -> Result<Vec<u8>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Status {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }
}

#[derive(Default)]
pub struct InMemoryCaseStore {
    pub files: Vec<CaseFile>,
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn list_cases(&self) -> Result<Vec<Case>, StoreError> {
        let mut cases: Vec<Case> = self.files.iter().map(|f| f.case.clone()).collect();
        cases.sort_by_key(|c| c.id);
        Ok(cases)
    }

    async fn load_case(&self, id: i32) -> Result<CaseFile, StoreError> {
        self.files
            .iter()
            .find(|f| f.case.id == id)
            .cloned()
            .ok_or(StoreError::CaseNotFound(id))
    }
}

/// Drafting service returning a fixed text and recording prompts.
pub struct StubDrafting {
    pub reply: String,
    pub configured: Vec<Provider>,
    pub prompts: Mutex<Vec<(Provider, String)>>,
}

impl StubDrafting {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            configured: vec![Provider::Gemini],
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DraftingService for StubDrafting {
    async fn draft(&self, provider: Provider, prompt: &str) -> String {
        self.prompts
            .lock()
            .unwrap()
            .push((provider, prompt.to_string()));
        self.reply.clone()
    }

    fn is_configured(&self, provider: Provider) -> bool {
        self.configured.contains(&provider)
    }
}

pub fn acme_case() -> Case {
    Case {
        id: 1,
        title: "Acme Dispute".to_string(),
        summary: "Breach".to_string(),
        risk_level: RiskLevel::High,
    }
}

pub fn message(id: i32, day: u32, sender: &str, subject: &str, body: &str) -> Message {
    Message {
        id,
        case_id: 1,
        sender: sender.to_string(),
        subject: subject.to_string(),
        body_text: Some(body.to_string()),
        date_sent: NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
    }
}

pub fn attachment(id: i32, filename: &str, locator: Option<&str>) -> Attachment {
    Attachment {
        id,
        case_id: 1,
        filename: filename.to_string(),
        locator: locator.map(str::to_string),
    }
}

/// The two-message Acme case with the given attachments.
pub fn acme_file(attachments: Vec<Attachment>) -> CaseFile {
    CaseFile::new(
        acme_case(),
        vec![
            message(1, 1, "A", "S1", "hello"),
            message(2, 2, "B", "S2", ""),
        ],
        attachments,
    )
}
