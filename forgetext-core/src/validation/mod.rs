//! Validation Engine - structural well-formedness per format
//!
//! Validators are pure and never fail: every problem, including errors
//! raised by underlying parsers, comes back as a [`ValidationResult`].

mod css;
mod html;
mod js;
mod json;
mod sql;
mod xml;

pub use css::CssValidator;
pub use html::{HtmlValidator, TagStackFrame, VOID_ELEMENTS};
pub use js::JsValidator;
pub use json::JsonValidator;
pub use sql::{SqlValidator, DANGEROUS_PATTERNS};
pub use xml::XmlValidator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::errors::{notification_title, DetailValue, Details, ErrorKind, Notification};

pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Text formats the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Xml,
    Html,
    Css,
    Js,
    Sql,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Json,
        Format::Xml,
        Format::Html,
        Format::Css,
        Format::Js,
        Format::Sql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Html => "html",
            Format::Css => "css",
            Format::Js => "js",
            Format::Sql => "sql",
        }
    }

    /// The kind reported when text of this format is malformed.
    pub fn invalid_kind(&self) -> ErrorKind {
        match self {
            Format::Json => ErrorKind::InvalidJson,
            Format::Xml => ErrorKind::InvalidXml,
            Format::Html => ErrorKind::InvalidHtml,
            Format::Css => ErrorKind::InvalidCss,
            Format::Js => ErrorKind::InvalidJs,
            Format::Sql => ErrorKind::InvalidSql,
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Xml => "application/xml",
            Format::Html => "text/html",
            Format::Css => "text/css",
            Format::Js => "text/javascript",
            Format::Sql => "application/sql",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported format: {0}")]
pub struct UnsupportedFormat(pub String);

impl FromStr for Format {
    type Err = UnsupportedFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            "html" | "htm" => Ok(Format::Html),
            "css" => Ok(Format::Css),
            "js" | "javascript" => Ok(Format::Js),
            "sql" => Ok(Format::Sql),
            _ => Err(UnsupportedFormat(s.to_string())),
        }
    }
}

/// Pass/fail verdict. A passing result never carries an error kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    is_valid: bool,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Details>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            message: None,
            error_kind: None,
            details: None,
        }
    }

    /// Failure carrying the kind's default message.
    pub fn failure(kind: ErrorKind) -> Self {
        Self::failure_with(kind, kind.default_message())
    }

    pub fn failure_with(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
            error_kind: Some(kind),
            details: None,
        }
    }

    /// Attach a detail. Ignored on a passing result.
    pub fn with_detail(mut self, key: &str, value: impl Into<DetailValue>) -> Self {
        if !self.is_valid {
            self.details
                .get_or_insert_with(Details::new)
                .insert(key.to_string(), value.into());
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    pub fn detail(&self, key: &str) -> Option<&DetailValue> {
        self.details.as_ref().and_then(|d| d.get(key))
    }

    pub fn is_security_violation(&self) -> bool {
        self.error_kind.map_or(false, |k| k.is_security())
    }

    pub fn notification(&self) -> Option<Notification> {
        let kind = self.error_kind?;
        Some(Notification {
            title: notification_title(kind).to_string(),
            description: self
                .message
                .clone()
                .unwrap_or_else(|| kind.default_message().to_string()),
            severity: kind.default_severity(),
        })
    }
}

/// One structural check per format.
pub trait FormatValidator: Send + Sync {
    fn format(&self) -> Format;

    /// Structural check on input already known to be non-blank.
    fn check(&self, text: &str) -> ValidationResult;

    fn validate(&self, text: &str) -> ValidationResult {
        let not_empty = validate_not_empty(text);
        if !not_empty.is_valid() {
            return not_empty;
        }
        self.check(text)
    }
}

/// Fails with `EmptyInput` when nothing but whitespace remains after trimming.
pub fn validate_not_empty(text: &str) -> ValidationResult {
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        ValidationResult::failure(ErrorKind::EmptyInput)
    } else {
        ValidationResult::success()
    }
}

/// Fails with `FileTooLarge` when `size` exceeds `max_mb` mebibytes.
pub fn validate_file_size(size: u64, max_mb: u64) -> ValidationResult {
    let max_size = max_mb.saturating_mul(BYTES_PER_MB);
    if size > max_size {
        ValidationResult::failure_with(
            ErrorKind::FileTooLarge,
            format!(
                "File is too large ({} bytes). Maximum size is {} MB",
                size, max_mb
            ),
        )
        .with_detail("size", size)
        .with_detail("maxSize", max_size)
    } else {
        ValidationResult::success()
    }
}

/// Validate `text` as `format` with the built-in validators.
pub fn validate(format: Format, text: &str) -> ValidationResult {
    let result = builtin(format).validate(text);
    tracing::debug!(
        %format,
        valid = result.is_valid(),
        code = result.error_kind().map(|k| k.code()),
        "validated input"
    );
    result
}

fn builtin(format: Format) -> &'static dyn FormatValidator {
    match format {
        Format::Json => &JsonValidator,
        Format::Xml => &XmlValidator,
        Format::Html => &HtmlValidator,
        Format::Css => &CssValidator,
        Format::Js => &JsValidator,
        Format::Sql => &SqlValidator,
    }
}

/// Dispatches to one validator per format; any of them can be replaced.
pub struct Validator {
    validators: Vec<Box<dyn FormatValidator>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            validators: vec![
                Box::new(JsonValidator),
                Box::new(XmlValidator),
                Box::new(HtmlValidator),
                Box::new(CssValidator),
                Box::new(JsValidator),
                Box::new(SqlValidator),
            ],
        }
    }

    /// Replace the validator for its format.
    pub fn register(&mut self, validator: Box<dyn FormatValidator>) {
        let format = validator.format();
        self.validators.retain(|v| v.format() != format);
        self.validators.push(validator);
    }

    pub fn validate(&self, format: Format, text: &str) -> ValidationResult {
        let result = match self.validators.iter().find(|v| v.format() == format) {
            Some(validator) => validator.validate(text),
            None => builtin(format).validate(text),
        };
        tracing::debug!(
            %format,
            valid = result.is_valid(),
            code = result.error_kind().map(|k| k.code()),
            "validated input"
        );
        result
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formats: Vec<_> = self.validators.iter().map(|v| v.format()).collect();
        f.debug_struct("Validator").field("formats", &formats).finish()
    }
}
