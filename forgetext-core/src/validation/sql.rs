use regex::Regex;
use std::sync::LazyLock;

use super::{Format, FormatValidator, ValidationResult};
use crate::errors::ErrorKind;

static STATEMENT_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:SELECT|INSERT|UPDATE|DELETE|CREATE|ALTER|DROP)\b").unwrap()
});

/// A known injection shape.
pub struct DangerousPattern {
    pub name: &'static str,
    regex: Regex,
}

impl DangerousPattern {
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// The fixed set of injection shapes the SQL validator blocks.
pub static DANGEROUS_PATTERNS: LazyLock<Vec<DangerousPattern>> = LazyLock::new(|| {
    let pattern = |name, re: &str| DangerousPattern {
        name,
        regex: Regex::new(re).unwrap(),
    };
    vec![
        pattern("stacked_drop", r"(?i);\s*DROP\b"),
        pattern("stacked_delete", r"(?i);\s*DELETE\s+FROM\b"),
        pattern(
            "union_information_schema",
            r"(?is)\bUNION\s+(?:ALL\s+)?SELECT\b.*\binformation_schema\b",
        ),
        pattern("numeric_tautology", r"(?i)\bOR\s+1\s*=\s*1\b"),
        pattern("string_tautology", r"(?i)\bOR\s+'1'\s*=\s*'1'"),
    ]
});

/// Requires a statement keyword, then rejects known injection patterns.
///
/// Injection matches are reported as `SecurityViolation`, never as
/// `InvalidSql`, so callers can block instead of warn.
pub struct SqlValidator;

impl FormatValidator for SqlValidator {
    fn format(&self) -> Format {
        Format::Sql
    }

    fn check(&self, text: &str) -> ValidationResult {
        if !STATEMENT_KEYWORD.is_match(text) {
            return ValidationResult::failure_with(
                ErrorKind::InvalidSql,
                "Invalid SQL: no SELECT, INSERT, UPDATE, DELETE, CREATE, ALTER or DROP statement found",
            );
        }

        if let Some(hit) = DANGEROUS_PATTERNS.iter().find(|p| p.is_match(text)) {
            return ValidationResult::failure_with(
                ErrorKind::SecurityViolation,
                "Potentially dangerous SQL pattern detected",
            )
            .with_detail("pattern", hit.name);
        }

        ValidationResult::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DetailValue;

    #[test]
    fn test_tautology_is_security_violation() {
        let result = SqlValidator.validate("SELECT * FROM users WHERE id = 1 OR 1=1");
        assert!(!result.is_valid());
        assert_eq!(result.error_kind(), Some(ErrorKind::SecurityViolation));
        assert!(result.is_security_violation());
        assert_eq!(
            result.detail("pattern"),
            Some(&DetailValue::Text("numeric_tautology".into()))
        );

        let result = SqlValidator.validate("select * from users where name = '' or '1'='1'");
        assert_eq!(result.error_kind(), Some(ErrorKind::SecurityViolation));
    }

    #[test]
    fn test_stacked_statements() {
        let result = SqlValidator.validate("SELECT name FROM t; DROP TABLE users");
        assert_eq!(result.error_kind(), Some(ErrorKind::SecurityViolation));

        let result = SqlValidator.validate("SELECT 1;\n  delete from users");
        assert_eq!(result.error_kind(), Some(ErrorKind::SecurityViolation));
    }

    #[test]
    fn test_union_information_schema() {
        let result = SqlValidator.validate(
            "SELECT id FROM a UNION SELECT table_name FROM information_schema.tables",
        );
        assert_eq!(result.error_kind(), Some(ErrorKind::SecurityViolation));
    }

    #[test]
    fn test_no_keyword_is_invalid_sql() {
        let result = SqlValidator.validate("This is not a SQL query");
        assert_eq!(result.error_kind(), Some(ErrorKind::InvalidSql));
    }

    #[test]
    fn test_ordinary_queries_pass() {
        assert!(SqlValidator.validate("select * FROM Users where ID = 1").is_valid());
        assert!(SqlValidator
            .validate("CREATE TABLE t (id INT);\nINSERT INTO t VALUES (1);")
            .is_valid());
        assert!(SqlValidator
            .validate("SELECT * FROM orders WHERE status = 'open' OR total > 10")
            .is_valid());
    }
}
