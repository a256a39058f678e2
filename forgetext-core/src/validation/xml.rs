use regex::Regex;
use std::sync::LazyLock;

use super::{Format, FormatValidator, ValidationResult};
use crate::errors::ErrorKind;

// Any tag that is not a closing tag, declaration, comment or doctype.
// Self-closing tags match here too.
static OPENING_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^/!?>][^>]*>").unwrap());
static CLOSING_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</[^>]+>").unwrap());
static SELF_CLOSING_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+/>").unwrap());
static NON_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>").unwrap());

/// Tag-count balance check.
///
/// Every opening tag must be matched by a closing tag or be self-closing:
/// `opening == closing + self_closing`. Nesting order is not checked, so
/// `<a><b></a></b>` passes.
pub struct XmlValidator;

impl FormatValidator for XmlValidator {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn check(&self, text: &str) -> ValidationResult {
        if text.contains("<<") || text.contains(">>") {
            return ValidationResult::failure_with(
                ErrorKind::InvalidXml,
                "Invalid XML syntax: unexpected '<<' or '>>'",
            );
        }

        let markup = NON_MARKUP.replace_all(text, "");
        let opening = OPENING_TAG.find_iter(&markup).count();
        let closing = CLOSING_TAG.find_iter(&markup).count();
        let self_closing = SELF_CLOSING_TAG.find_iter(&markup).count();

        if opening != closing + self_closing {
            return ValidationResult::failure_with(
                ErrorKind::InvalidXml,
                format!(
                    "Mismatched XML tags: {} opening, {} closing, {} self-closing",
                    opening, closing, self_closing
                ),
            )
            .with_detail("openingTags", opening)
            .with_detail("closingTags", closing)
            .with_detail("selfClosingTags", self_closing);
        }

        ValidationResult::success()
    }
}
