//! Draft text to presentational markup.
//!
//! Drafts arrive as plain text using two conventions: `**bold**` spans and
//! `## heading` lines. [`translate`] turns them into a small tag subset
//! (`<br/>`, `<b>`, `<i>`, `<font size="N">`) and [`parse`] reads that subset
//! back into inline nodes for the composer.
//!
//! Translation is single-pass: conventions are consumed, so re-applying
//! [`translate`] to its own output leaves existing tags alone, but callers
//! should still run it exactly once per raw fragment.

use lazy_static::lazy_static;
use regex::Regex;

use super::RenderError;

/// Font size used for `## heading` lines.
pub const HEADING_FONT_SIZE: u8 = 14;

pub const LINE_BREAK: &str = "<br/>";

/// Tags the parser interprets; everything else is text.
const STRUCTURAL_TAGS: [&str; 4] = ["br", "b", "i", "font"];

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?m)^##[ \t]+(.*?)[ \t]*$\n?").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
    static ref TAG: Regex =
        Regex::new(r#"^<(/?)([A-Za-z]+)((?:\s+[A-Za-z]+\s*=\s*"[^"]*")*)\s*(/?)>"#).unwrap();
    static ref SIZE_ATTR: Regex = Regex::new(r#"size\s*=\s*"(\d{1,2})""#).unwrap();
}

/// Convert a raw draft into the markup subset.
///
/// A heading does not need a line break after it: a `## X` final line is
/// still converted and gains a trailing `<br/>`, so drafts that end on a
/// heading render it as one instead of as literal `##` text.
pub fn translate(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let headings = HEADING.replace_all(
        &normalized,
        format!("<font size=\"{HEADING_FONT_SIZE}\"><b>${{1}}</b></font>{LINE_BREAK}").as_str(),
    );
    let breaks = headings.replace('\n', LINE_BREAK);
    BOLD.replace_all(&breaks, "<b>${1}</b>").into_owned()
}

/// One inline element of parsed markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Break,
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Font { size: u8, children: Vec<Inline> },
}

#[derive(Debug)]
enum Open {
    Bold,
    Italic,
    Font(u8),
}

impl Open {
    fn tag(&self) -> &'static str {
        match self {
            Self::Bold => "b",
            Self::Italic => "i",
            Self::Font(_) => "font",
        }
    }

    fn close(self, children: Vec<Inline>) -> Inline {
        match self {
            Self::Bold => Inline::Bold(children),
            Self::Italic => Inline::Italic(children),
            Self::Font(size) => Inline::Font { size, children },
        }
    }
}

/// Parse the markup subset produced by [`translate`].
///
/// Only `<br/>`, `<b>`, `<i>` and `<font size="N">` are structural. Any
/// other tag-shaped run, and a `<` that does not start a tag, is literal
/// text. Unbalanced structural tags and invalid font sizes are errors.
pub fn parse(markup: &str) -> Result<Vec<Inline>, RenderError> {
    let mut stack: Vec<(Open, Vec<Inline>)> = Vec::new();
    let mut current: Vec<Inline> = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while pos < markup.len() {
        let rest = &markup[pos..];
        let Some(caps) = rest.starts_with('<').then(|| TAG.captures(rest)).flatten() else {
            let ch = rest.chars().next().unwrap_or_default();
            text.push(ch);
            pos += ch.len_utf8().max(1);
            continue;
        };

        let whole = caps.get(0).map_or(0, |m| m.end());
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        if !STRUCTURAL_TAGS.contains(&name.as_str()) {
            text.push_str(&rest[..whole]);
            pos += whole;
            continue;
        }
        let attrs = caps.get(3).map_or("", |m| m.as_str());
        let self_closing = !caps[4].is_empty();

        flush_text(&mut text, &mut current);

        match (name.as_str(), closing) {
            ("br", false) => current.push(Inline::Break),
            ("b" | "i" | "font", false) if self_closing => {
                return Err(markup_error(pos, format!("<{name}/> cannot be self-closing")));
            }
            ("b", false) => stack.push((Open::Bold, std::mem::take(&mut current))),
            ("i", false) => stack.push((Open::Italic, std::mem::take(&mut current))),
            ("font", false) => {
                let size = SIZE_ATTR
                    .captures(attrs)
                    .and_then(|c| c[1].parse::<u8>().ok())
                    .filter(|size| *size > 0)
                    .ok_or_else(|| markup_error(pos, "<font> needs a numeric size"))?;
                stack.push((Open::Font(size), std::mem::take(&mut current)));
            }
            ("b" | "i" | "font", true) => match stack.pop() {
                Some((open, parent)) if open.tag() == name => {
                    let children = std::mem::replace(&mut current, parent);
                    current.push(open.close(children));
                }
                Some((open, _)) => {
                    return Err(markup_error(
                        pos,
                        format!("</{name}> closes <{}>", open.tag()),
                    ));
                }
                None => return Err(markup_error(pos, format!("</{name}> without opening tag"))),
            },
            (other, _) => return Err(markup_error(pos, format!("unexpected </{other}>"))),
        }

        pos += whole;
    }

    flush_text(&mut text, &mut current);

    if let Some((open, _)) = stack.pop() {
        return Err(markup_error(markup.len(), format!("<{}> is never closed", open.tag())));
    }

    Ok(current)
}

fn flush_text(text: &mut String, into: &mut Vec<Inline>) {
    if !text.is_empty() {
        into.push(Inline::Text(std::mem::take(text)));
    }
}

fn markup_error(position: usize, message: impl Into<String>) -> RenderError {
    RenderError::Markup {
        position,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_is_converted() {
        let out = translate("this is **bold** text");
        assert_eq!(out, "this is <b>bold</b> text");
        assert!(!out.contains('*'));
    }

    #[test]
    fn test_bold_is_non_greedy() {
        assert_eq!(translate("**a** and **b**"), "<b>a</b> and <b>b</b>");
    }

    #[test]
    fn test_unpaired_marker_stays_literal() {
        assert_eq!(translate("**a** then **b"), "<b>a</b> then **b");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(translate("one\ntwo\r\nthree"), "one<br/>two<br/>three");
    }

    #[test]
    fn test_heading_consumes_marker_and_break() {
        assert_eq!(
            translate("## Facts\nbody"),
            "<font size=\"14\"><b>Facts</b></font><br/>body"
        );
    }

    #[test]
    fn test_heading_on_last_line() {
        assert_eq!(
            translate("intro\n## Remedy"),
            "intro<br/><font size=\"14\"><b>Remedy</b></font><br/>"
        );
    }

    #[test]
    fn test_heading_requires_line_start() {
        assert_eq!(translate("see ## note"), "see ## note");
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(translate("Dear Sirs, a < b & c"), "Dear Sirs, a < b & c");
        assert_eq!(translate(""), "");
    }

    #[test]
    fn test_second_pass_does_not_rewrap() {
        let once = translate("## Title\nWe **demand** payment.\n");
        let twice = translate(&once);
        assert_eq!(once, twice);
        assert!(!twice.contains("<b><b>"));
    }

    #[test]
    fn test_parse_nested() {
        let nodes = parse("<font size=\"14\"><b>Head</b></font><br/>x").unwrap();
        assert_eq!(
            nodes,
            vec![
                Inline::Font {
                    size: 14,
                    children: vec![Inline::Bold(vec![Inline::Text("Head".into())])],
                },
                Inline::Break,
                Inline::Text("x".into()),
            ]
        );
    }

    #[test]
    fn test_parse_literal_angle_bracket() {
        let nodes = parse("a < b").unwrap();
        assert_eq!(nodes, vec![Inline::Text("a < b".into())]);
    }

    #[test]
    fn test_parse_keeps_foreign_tags_as_text() {
        let nodes = parse(&translate("Please see <p>attached</p> invoice")).unwrap();
        assert_eq!(
            nodes,
            vec![Inline::Text("Please see <p>attached</p> invoice".into())]
        );
    }

    #[test]
    fn test_parse_html_error_page_mixed_with_markup() {
        let raw = "Brain Error: API returned HTTP 502: <html><body><h1>502 Bad Gateway</h1></body></html>";
        let nodes = parse(&translate(&format!("**Note**\n{raw}"))).unwrap();
        assert_eq!(
            nodes,
            vec![
                Inline::Bold(vec![Inline::Text("Note".into())]),
                Inline::Break,
                Inline::Text(raw.into()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_unbalanced() {
        assert!(parse("<b>open").is_err());
        assert!(parse("close</b>").is_err());
        assert!(parse("<b><i>x</b></i>").is_err());
    }

    #[test]
    fn test_parse_rejects_closing_break() {
        assert!(parse("a</br>b").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_font_size() {
        assert!(parse("<font size=\"big\">x</font>").is_err());
    }
}
