use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::{Format, FormatValidator, ValidationResult};
use crate::errors::ErrorKind;

/// Elements that never take a closing tag.
pub const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/)?([A-Za-z][A-Za-z0-9:-]*)(?:\s[^>]*?)?\s*(/)?>").unwrap()
});
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static RAW_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<(?:script|style)\b[^>]*>)(.*?)(</(?:script|style)\s*>)").unwrap()
});

/// An opening tag waiting for its closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagStackFrame {
    pub tag_name: String,
    /// Byte offset of the opening `<`.
    pub position: usize,
}

/// Stack automaton over opening and closing tags.
pub struct HtmlValidator;

impl FormatValidator for HtmlValidator {
    fn format(&self) -> Format {
        Format::Html
    }

    fn check(&self, text: &str) -> ValidationResult {
        let scanned = blank_non_markup(text);
        let mut stack: Vec<TagStackFrame> = Vec::new();

        for caps in TAG.captures_iter(&scanned) {
            let Some(whole) = caps.get(0) else { continue };
            let name = caps[2].to_ascii_lowercase();
            if is_void(&name) {
                continue;
            }

            let is_closing = caps.get(1).is_some();
            let is_self_closing = caps.get(3).is_some();

            if !is_closing {
                if !is_self_closing {
                    stack.push(TagStackFrame {
                        tag_name: name,
                        position: whole.start(),
                    });
                }
                continue;
            }

            match stack.pop() {
                Some(frame) if frame.tag_name == name => {}
                Some(frame) => {
                    return ValidationResult::failure_with(
                        ErrorKind::InvalidHtml,
                        format!(
                            "Mismatched closing tag </{}>: expected </{}>",
                            name, frame.tag_name
                        ),
                    )
                    .with_detail("closingTag", name)
                    .with_detail("expectedTag", frame.tag_name)
                    .with_detail("position", whole.start());
                }
                None => {
                    return ValidationResult::failure_with(
                        ErrorKind::InvalidHtml,
                        format!("Unexpected closing tag </{}>", name),
                    )
                    .with_detail("closingTag", name)
                    .with_detail("position", whole.start());
                }
            }
        }

        if !stack.is_empty() {
            let unclosed: Vec<String> = stack.into_iter().map(|f| f.tag_name).collect();
            return ValidationResult::failure_with(
                ErrorKind::InvalidHtml,
                format!("Unclosed tags: {}", unclosed.join(", ")),
            )
            .with_detail("unclosedTags", unclosed);
        }

        ValidationResult::success()
    }
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

// Comments and script/style bodies are replaced by spaces so byte offsets
// still point into the caller's text.
fn blank_non_markup(text: &str) -> String {
    let without_comments = COMMENT.replace_all(text, |caps: &Captures| " ".repeat(caps[0].len()));
    RAW_TEXT
        .replace_all(&without_comments, |caps: &Captures| {
            format!("{}{}{}", &caps[1], " ".repeat(caps[2].len()), &caps[3])
        })
        .into_owned()
}
