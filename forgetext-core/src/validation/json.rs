use serde::de::{Deserialize, IgnoredAny};

use super::{Format, FormatValidator, ValidationResult};
use crate::errors::ErrorKind;

/// Delegates to `serde_json`; the first parse error is the verdict.
///
/// Only the grammar is checked. Numbers are not range-checked, `\u` escapes
/// are not decoded and nesting depth is unbounded.
pub struct JsonValidator;

impl FormatValidator for JsonValidator {
    fn format(&self) -> Format {
        Format::Json
    }

    fn check(&self, text: &str) -> ValidationResult {
        match parse(text) {
            Ok(_) => ValidationResult::success(),
            Err(e) => ValidationResult::failure_with(
                ErrorKind::InvalidJson,
                format!("{}: {}", ErrorKind::InvalidJson.default_message(), e),
            )
            .with_detail("parseError", e.to_string())
            .with_detail("line", e.line())
            .with_detail("column", e.column()),
        }
    }
}

fn parse(text: &str) -> Result<(), serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    IgnoredAny::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DetailValue;

    #[test]
    fn test_valid_documents() {
        for doc in [
            r#"{"name": "John", "age": 30}"#,
            "[1, 2, 3]",
            r#""just a string""#,
            "42",
            "null",
            " \n {\"nested\": {\"deep\": [true, false]}} \n",
        ] {
            assert!(JsonValidator.validate(doc).is_valid(), "{doc}");
        }
    }

    #[test]
    fn test_invalid_documents() {
        for doc in [
            r#"{"name": "John",}"#,
            "{name: 'John'}",
            "[1, 2",
            "{} {}",
            "NaN",
        ] {
            let result = JsonValidator.validate(doc);
            assert!(!result.is_valid(), "{doc}");
            assert_eq!(result.error_kind(), Some(ErrorKind::InvalidJson));
        }
    }

    #[test]
    fn test_parser_message_captured() {
        let result = JsonValidator.validate("{\n  \"a\": }");
        assert!(matches!(result.detail("parseError"), Some(DetailValue::Text(_))));
        assert_eq!(result.detail("line"), Some(&DetailValue::Count(2)));
    }

    #[test]
    fn test_numbers_beyond_f64_are_valid() {
        for doc in ["1e400", "-1e400", "[123456789012345678901234567890.5e-999]"] {
            assert!(JsonValidator.validate(doc).is_valid(), "{doc}");
        }
    }

    #[test]
    fn test_lone_surrogate_escapes_are_valid() {
        assert!(JsonValidator.validate(r#""\ud800""#).is_valid());
        assert!(JsonValidator.validate(r#"{"k": "a\uDC00b"}"#).is_valid());
        assert!(!JsonValidator.validate(r#""\ud80""#).is_valid());
    }

    #[test]
    fn test_deep_nesting_is_valid() {
        let deep = format!("{}{}", "[".repeat(10_000), "]".repeat(10_000));
        assert!(JsonValidator.validate(&deep).is_valid());

        let unbalanced = format!("{}{}", "[".repeat(200), "]".repeat(199));
        assert_eq!(
            JsonValidator.validate(&unbalanced).error_kind(),
            Some(ErrorKind::InvalidJson)
        );
    }
}
