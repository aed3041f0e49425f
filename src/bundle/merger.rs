//! Merging of fetched PDF attachments into the composed document.
//!
//! Each source document is renumbered past the objects already collected,
//! its pages are re-parented under a single page tree, and the catalog is
//! rebuilt when the merge is finished. Pages keep the order of
//! [`Document::get_pages`], documents keep the order they were appended in.

use std::fmt;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::case::models::Attachment;
use crate::storage::EvidenceFetcher;

/// Extensions of attachments that are merged into the bundle.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];
const MAX_TREE_DEPTH: usize = 64;

/// Why an attachment did not make it into the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedType,
    NotCloudLinked,
    Unavailable,
    InvalidDocument(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType => f.write_str("not a PDF document"),
            Self::NotCloudLinked => f.write_str("no cloud locator"),
            Self::Unavailable => f.write_str("could not be fetched"),
            Self::InvalidDocument(reason) => write!(f, "unreadable PDF: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentOutcome {
    Merged { pages: usize },
    Skipped(SkipReason),
}

impl AttachmentOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }
}

/// Whether `filename` has one of the [`DOCUMENT_EXTENSIONS`], case-insensitively.
pub fn is_document_filename(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Accumulates pages from several PDFs into one document.
pub struct PdfMerger {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    merged: usize,
}

impl PdfMerger {
    /// Start a merge with `base` as the first pages of the output.
    pub fn new(base: &[u8]) -> Result<Self, lopdf::Error> {
        let base = Document::load_mem(base)?;
        let mut document = Document::with_version(base.version.clone());
        let pages_id = document.new_object_id();

        let mut merger = Self {
            document,
            pages_id,
            kids: Vec::new(),
            merged: 0,
        };
        merger.append(base);
        Ok(merger)
    }

    /// Attachments appended so far; the base document is not counted.
    pub fn merged_count(&self) -> usize {
        self.merged
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Run one attachment through the eligibility checks, the fetcher and the
    /// parser, appending its pages on success. Never fails the merge.
    pub async fn merge_attachment(
        &mut self,
        attachment: &Attachment,
        fetcher: &EvidenceFetcher<'_>,
    ) -> AttachmentOutcome {
        if !is_document_filename(&attachment.filename) {
            return AttachmentOutcome::Skipped(SkipReason::UnsupportedType);
        }
        if !attachment.is_cloud_linked() {
            return AttachmentOutcome::Skipped(SkipReason::NotCloudLinked);
        }
        let Some(reader) = fetcher.fetch(attachment.locator.as_deref()).await else {
            return AttachmentOutcome::Skipped(SkipReason::Unavailable);
        };

        match self.append_bytes(reader) {
            Ok(pages) => AttachmentOutcome::Merged { pages },
            Err(reason) => AttachmentOutcome::Skipped(SkipReason::InvalidDocument(reason)),
        }
    }

    /// Parse an attachment and append its pages, counting it as merged.
    pub fn append_bytes<R: std::io::Read>(&mut self, reader: R) -> Result<usize, String> {
        let source = Document::load_from(reader).map_err(|e| e.to_string())?;
        if source.trailer.has(b"Encrypt") {
            return Err("document is encrypted".to_string());
        }
        match self.append(source) {
            0 => Err("document has no pages".to_string()),
            pages => {
                self.merged += 1;
                Ok(pages)
            }
        }
    }

    /// Move every page of `source` into the output. Returns the number of pages added.
    fn append(&mut self, mut source: Document) -> usize {
        source.renumber_objects_with(self.document.max_id + 1);

        let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
        let pages: Vec<(ObjectId, Dictionary)> = page_ids
            .iter()
            .filter_map(|&id| page_with_inherited(&source, id).map(|dict| (id, dict)))
            .collect();
        if pages.is_empty() {
            return 0;
        }

        for (id, object) in std::mem::take(&mut source.objects) {
            match object.type_name().unwrap_or("") {
                "Catalog" | "Pages" | "Page" | "Outlines" | "Outline" => {}
                _ => {
                    self.document.objects.insert(id, object);
                }
            }
        }

        for (id, mut dict) in pages.iter().cloned() {
            dict.set("Parent", Object::Reference(self.pages_id));
            self.document.objects.insert(id, Object::Dictionary(dict));
            self.kids.push(id);
        }

        self.document.max_id = self
            .document
            .objects
            .keys()
            .map(|(id, _)| *id)
            .max()
            .unwrap_or(self.document.max_id)
            .max(self.document.max_id);

        pages.len()
    }

    /// Build the page tree and catalog and serialize the merged document.
    pub fn finish(mut self) -> Result<Vec<u8>, lopdf::Error> {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
        ]);
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.document.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.document.trailer.set("Root", Object::Reference(catalog_id));

        self.document.compress();

        let mut output = Vec::new();
        self.document.save_to(&mut output)?;
        Ok(output)
    }
}

/// The page dictionary with inherited attributes copied down from its ancestors.
fn page_with_inherited(source: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut dict = source.get_dictionary(page_id).ok()?.clone();
    let mut parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        let Ok(node) = source.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !dict.has(key) {
                if let Ok(value) = node.get(key) {
                    dict.set(key, value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    Some(dict)
}
