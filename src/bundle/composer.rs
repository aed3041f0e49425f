//! Layout of the demand letter and the evidence schedule.
//!
//! The composer produces the complete Typst source of the base document:
//! title block, drafted letter, signature, a hard page break, then one
//! evidence entry per message. Rendering that source is the engine's job.

use std::fmt::Write;
use std::fs;

use super::common::{escape_typst_string, format_letter_date, get_static_dir, typst_text};
use super::markup::{self, Inline};
use super::RenderError;
use crate::case::models::{Case, Message};

const TEMPLATE_FILE: &str = "demand_bundle.typ";

pub const TITLE: &str = "NOTICE OF CLAIM / LEGAL DEMAND";
pub const EVIDENCE_HEADING: &str = "SCHEDULE OF EVIDENCE";
pub const DEFAULT_SIGNATURE: &str = "Red Square Group Legal Dept.";

/// Characters of each message body shown in the evidence schedule.
pub const EVIDENCE_BODY_LIMIT: usize = 500;

/// Suffix after a truncated body, and the placeholder for an empty one.
pub const ELLIPSIS: &str = "...";

pub struct DemandBundleComposer {
    preamble: String,
    signature: String,
    date_override: Option<String>,
}

impl DemandBundleComposer {
    /// Create a composer using the preamble in the static directory.
    pub fn new() -> Result<Self, RenderError> {
        let template_path = get_static_dir().join(TEMPLATE_FILE);
        let preamble = fs::read_to_string(&template_path).map_err(RenderError::TemplateIo)?;
        Ok(Self::with_preamble(preamble))
    }

    pub fn with_preamble(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
            signature: DEFAULT_SIGNATURE.to_string(),
            date_override: None,
        }
    }

    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Fix the `DATE:` line instead of reading the clock.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date_override = Some(date.into());
        self
    }

    /// Compose the base document. `draft_markup` must already be translated.
    pub fn compose(
        &self,
        case: &Case,
        messages: &[Message],
        draft_markup: &str,
    ) -> Result<String, RenderError> {
        let draft = markup::parse(draft_markup)?;
        let date = self
            .date_override
            .clone()
            .unwrap_or_else(format_letter_date);

        let mut out = String::with_capacity(self.preamble.len() + draft_markup.len() * 2);
        out.push_str(&self.preamble);
        out.push('\n');
        block(
            &mut out,
            &format!(
                "#set document(title: \"{}\")",
                escape_typst_string(&case.title)
            ),
        );

        // Letter
        block(&mut out, &format!("#bundle_title[{}]", typst_text(TITLE)));
        block(
            &mut out,
            &format!(
                "#strong[DATE:] {}#linebreak()#strong[REF CASE:] {}",
                typst_text(&date),
                typst_text(&case.title)
            ),
        );
        block(&mut out, "#v(15pt)");
        block(&mut out, &render_inlines(&draft));
        block(&mut out, "#v(20pt)");
        block(&mut out, &format!("#strong[{}]", typst_text(&self.signature)));
        block(&mut out, "#pagebreak()");

        // Evidence schedule
        block(
            &mut out,
            &format!("#section_heading[{}]", typst_text(EVIDENCE_HEADING)),
        );
        let mut ordered: Vec<&Message> = messages.iter().collect();
        ordered.sort_by_key(|m| m.date_sent);
        for message in ordered {
            self.evidence_entry(&mut out, message)?;
        }

        Ok(out)
    }

    fn evidence_entry(&self, out: &mut String, message: &Message) -> Result<(), RenderError> {
        let header = format!("[{}] {}", message.sent_date(), message.sender);
        let body = markup::parse(&markup::translate(&evidence_excerpt(message.body())))?;

        block(out, &format!("#strong[{}]", typst_text(&header)));
        block(
            out,
            &format!(
                "#emph[{}]#linebreak(){}",
                typst_text(&format!("Subject: {}", message.subject)),
                render_inlines(&body)
            ),
        );
        block(out, "#v(10pt)");
        Ok(())
    }
}

/// Body text as shown in the schedule: the first [`EVIDENCE_BODY_LIMIT`]
/// characters plus an ellipsis, or just the ellipsis when there is no body.
pub fn evidence_excerpt(body: &str) -> String {
    if body.is_empty() {
        return ELLIPSIS.to_string();
    }
    format!("{}{}", truncate_chars(body, EVIDENCE_BODY_LIMIT), ELLIPSIS)
}

/// Longest prefix of `value` holding at most `limit` characters.
pub fn truncate_chars(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

fn block(out: &mut String, content: &str) {
    out.push_str(content);
    out.push_str("\n\n");
}

fn render_inlines(nodes: &[Inline]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Inline::Text(text) => out.push_str(&typst_text(text)),
            Inline::Break => out.push_str("#linebreak()"),
            Inline::Bold(children) => {
                let _ = write!(out, "#strong[{}]", render_inlines(children));
            }
            Inline::Italic(children) => {
                let _ = write!(out, "#emph[{}]", render_inlines(children));
            }
            Inline::Font { size, children } => {
                let _ = write!(out, "#text(size: {size}pt)[{}]", render_inlines(children));
            }
        }
    }
    out
}
