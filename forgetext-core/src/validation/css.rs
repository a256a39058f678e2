use regex::Regex;
use std::sync::LazyLock;

use super::{Format, FormatValidator, ValidationResult};
use crate::errors::ErrorKind;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
// A selector (or at-rule prelude) followed by a block.
static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^{}\s][^{}]*\{[^{}]*\}").unwrap());

/// Brace balance plus "at least one rule" check.
pub struct CssValidator;

impl FormatValidator for CssValidator {
    fn format(&self) -> Format {
        Format::Css
    }

    fn check(&self, text: &str) -> ValidationResult {
        let open = text.matches('{').count();
        let close = text.matches('}').count();
        if open != close {
            return ValidationResult::failure_with(
                ErrorKind::InvalidCss,
                format!("Mismatched braces: {} opening, {} closing", open, close),
            )
            .with_detail("openBraces", open)
            .with_detail("closeBraces", close);
        }

        let stripped = COMMENT.replace_all(text, "");
        if !RULE.is_match(&stripped) {
            return ValidationResult::failure_with(
                ErrorKind::InvalidCss,
                "Invalid CSS syntax: no selector with a declaration block found",
            );
        }

        ValidationResult::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DetailValue;

    #[test]
    fn test_valid_stylesheets() {
        assert!(CssValidator.validate("body { margin: 0; }").is_valid());
        assert!(CssValidator
            .validate("/* reset */\n.a, #b > p:hover { color: red }\n@media (max-width: 600px) { .a { display: none; } }")
            .is_valid());
        assert!(CssValidator.validate("p{}").is_valid());
    }

    #[test]
    fn test_brace_mismatch_reports_counts() {
        let result = CssValidator.validate("body { margin: 0; ");
        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidCss));
        assert_eq!(result.detail("openBraces"), Some(&DetailValue::Count(1)));
        assert_eq!(result.detail("closeBraces"), Some(&DetailValue::Count(0)));
    }

    #[test]
    fn test_no_rule_is_syntax_error() {
        let result = CssValidator.validate("color: red;");
        assert!(!result.is_valid());
        assert!(result.details().is_none());

        let result = CssValidator.validate("/* body { margin: 0 } */");
        assert!(!result.is_valid());
    }
}
