//! Error Classification Registry
//!
//! Every failure the engine can surface has a stable kind, a default
//! message and a default severity. The registry turns kinds into immutable
//! error records and keeps an observable log of everything it constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// Fallback text for codes the registry does not know.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Stable, machine-readable error identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    EmptyInput,
    InvalidFormat,
    InvalidJson,
    InvalidXml,
    InvalidHtml,
    InvalidSql,
    InvalidCss,
    InvalidJs,
    ProcessingFailed,
    MinificationFailed,
    FormattingFailed,
    ConversionFailed,
    FileTooLarge,
    FileReadError,
    FileWriteError,
    UnsupportedFormat,
    NetworkError,
    TimeoutError,
    SecurityViolation,
    UnsafeContent,
    BrowserNotSupported,
    ClipboardAccessDenied,
    StorageQuotaExceeded,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 23] = [
        ErrorKind::EmptyInput,
        ErrorKind::InvalidFormat,
        ErrorKind::InvalidJson,
        ErrorKind::InvalidXml,
        ErrorKind::InvalidHtml,
        ErrorKind::InvalidSql,
        ErrorKind::InvalidCss,
        ErrorKind::InvalidJs,
        ErrorKind::ProcessingFailed,
        ErrorKind::MinificationFailed,
        ErrorKind::FormattingFailed,
        ErrorKind::ConversionFailed,
        ErrorKind::FileTooLarge,
        ErrorKind::FileReadError,
        ErrorKind::FileWriteError,
        ErrorKind::UnsupportedFormat,
        ErrorKind::NetworkError,
        ErrorKind::TimeoutError,
        ErrorKind::SecurityViolation,
        ErrorKind::UnsafeContent,
        ErrorKind::BrowserNotSupported,
        ErrorKind::ClipboardAccessDenied,
        ErrorKind::StorageQuotaExceeded,
    ];

    /// Wire code, e.g. `INVALID_JSON`.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::EmptyInput => "EMPTY_INPUT",
            ErrorKind::InvalidFormat => "INVALID_FORMAT",
            ErrorKind::InvalidJson => "INVALID_JSON",
            ErrorKind::InvalidXml => "INVALID_XML",
            ErrorKind::InvalidHtml => "INVALID_HTML",
            ErrorKind::InvalidSql => "INVALID_SQL",
            ErrorKind::InvalidCss => "INVALID_CSS",
            ErrorKind::InvalidJs => "INVALID_JS",
            ErrorKind::ProcessingFailed => "PROCESSING_FAILED",
            ErrorKind::MinificationFailed => "MINIFICATION_FAILED",
            ErrorKind::FormattingFailed => "FORMATTING_FAILED",
            ErrorKind::ConversionFailed => "CONVERSION_FAILED",
            ErrorKind::FileTooLarge => "FILE_TOO_LARGE",
            ErrorKind::FileReadError => "FILE_READ_ERROR",
            ErrorKind::FileWriteError => "FILE_WRITE_ERROR",
            ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::TimeoutError => "TIMEOUT_ERROR",
            ErrorKind::SecurityViolation => "SECURITY_VIOLATION",
            ErrorKind::UnsafeContent => "UNSAFE_CONTENT",
            ErrorKind::BrowserNotSupported => "BROWSER_NOT_SUPPORTED",
            ErrorKind::ClipboardAccessDenied => "CLIPBOARD_ACCESS_DENIED",
            ErrorKind::StorageQuotaExceeded => "STORAGE_QUOTA_EXCEEDED",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::EmptyInput
            | ErrorKind::InvalidFormat
            | ErrorKind::InvalidJson
            | ErrorKind::InvalidXml
            | ErrorKind::InvalidHtml
            | ErrorKind::InvalidSql
            | ErrorKind::InvalidCss
            | ErrorKind::InvalidJs => ErrorCategory::Validation,
            ErrorKind::ProcessingFailed
            | ErrorKind::MinificationFailed
            | ErrorKind::FormattingFailed
            | ErrorKind::ConversionFailed => ErrorCategory::Processing,
            ErrorKind::FileTooLarge
            | ErrorKind::FileReadError
            | ErrorKind::FileWriteError
            | ErrorKind::UnsupportedFormat
            | ErrorKind::NetworkError
            | ErrorKind::TimeoutError => ErrorCategory::Resource,
            ErrorKind::SecurityViolation | ErrorKind::UnsafeContent => ErrorCategory::Security,
            ErrorKind::BrowserNotSupported
            | ErrorKind::ClipboardAccessDenied
            | ErrorKind::StorageQuotaExceeded => ErrorCategory::System,
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self.category() {
            ErrorCategory::Security => Severity::Critical,
            _ => Severity::Error,
        }
    }

    /// Lowest severity a record of this kind may carry.
    pub fn minimum_severity(&self) -> Severity {
        match self.category() {
            ErrorCategory::Security => Severity::Warning,
            _ => Severity::Info,
        }
    }

    pub fn default_message(&self) -> &'static str {
        self.message(Locale::En)
    }

    pub fn message(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => english_message(*self),
            Locale::Es => spanish_message(*self),
        }
    }

    pub fn is_security(&self) -> bool {
        self.category() == ErrorCategory::Security
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ErrorKind {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ErrorKind::ALL
            .iter()
            .copied()
            .find(|k| k.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownErrorCode(s.to_string()))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

fn english_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::EmptyInput => "Please enter some content to process",
        ErrorKind::InvalidFormat => "The input format is invalid",
        ErrorKind::InvalidJson => "Invalid JSON format. Please check your syntax",
        ErrorKind::InvalidXml => "Invalid XML format. Please check your tags and structure",
        ErrorKind::InvalidHtml => "Invalid HTML format. Please check your tags",
        ErrorKind::InvalidSql => "Invalid SQL syntax. Please check your query",
        ErrorKind::InvalidCss => "Invalid CSS syntax. Please check your rules and braces",
        ErrorKind::InvalidJs => "Invalid JavaScript syntax. Please check your code",
        ErrorKind::ProcessingFailed => "Processing failed. Please try again",
        ErrorKind::MinificationFailed => "Minification failed. Please check your input",
        ErrorKind::FormattingFailed => "Formatting failed. Please check your input",
        ErrorKind::ConversionFailed => "Conversion failed. Please check your input",
        ErrorKind::FileTooLarge => "File is too large. Please use a smaller file",
        ErrorKind::FileReadError => "Could not read the file",
        ErrorKind::FileWriteError => "Could not write the file",
        ErrorKind::UnsupportedFormat => "This format is not supported",
        ErrorKind::NetworkError => "Network error. Please check your connection",
        ErrorKind::TimeoutError => "The operation timed out",
        ErrorKind::SecurityViolation => "Potentially dangerous content detected",
        ErrorKind::UnsafeContent => "The content is unsafe to process",
        ErrorKind::BrowserNotSupported => "This feature is not supported in your environment",
        ErrorKind::ClipboardAccessDenied => "Clipboard access was denied",
        ErrorKind::StorageQuotaExceeded => "Storage quota exceeded",
    }
}

fn spanish_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::EmptyInput => "Introduce algún contenido para procesar",
        ErrorKind::InvalidFormat => "El formato de entrada no es válido",
        ErrorKind::InvalidJson => "Formato JSON no válido. Revisa la sintaxis",
        ErrorKind::InvalidXml => "Formato XML no válido. Revisa las etiquetas y la estructura",
        ErrorKind::InvalidHtml => "Formato HTML no válido. Revisa las etiquetas",
        ErrorKind::InvalidSql => "Sintaxis SQL no válida. Revisa la consulta",
        ErrorKind::InvalidCss => "Sintaxis CSS no válida. Revisa las reglas y las llaves",
        ErrorKind::InvalidJs => "Sintaxis JavaScript no válida. Revisa el código",
        ErrorKind::ProcessingFailed => "El procesamiento falló. Inténtalo de nuevo",
        ErrorKind::MinificationFailed => "La minificación falló. Revisa la entrada",
        ErrorKind::FormattingFailed => "El formateo falló. Revisa la entrada",
        ErrorKind::ConversionFailed => "La conversión falló. Revisa la entrada",
        ErrorKind::FileTooLarge => "El archivo es demasiado grande. Usa uno más pequeño",
        ErrorKind::FileReadError => "No se pudo leer el archivo",
        ErrorKind::FileWriteError => "No se pudo escribir el archivo",
        ErrorKind::UnsupportedFormat => "Este formato no es compatible",
        ErrorKind::NetworkError => "Error de red. Revisa tu conexión",
        ErrorKind::TimeoutError => "La operación superó el tiempo de espera",
        ErrorKind::SecurityViolation => "Se detectó contenido potencialmente peligroso",
        ErrorKind::UnsafeContent => "El contenido no es seguro para procesar",
        ErrorKind::BrowserNotSupported => "Esta función no es compatible con tu entorno",
        ErrorKind::ClipboardAccessDenied => "Se denegó el acceso al portapapeles",
        ErrorKind::StorageQuotaExceeded => "Se superó la cuota de almacenamiento",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Severity tiers, lowest ceiling first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Validation,
    Processing,
    Resource,
    Security,
    System,
}

/// A scalar or list attached to a result or error record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Count(u64),
    Text(String),
    List(Vec<String>),
}

impl From<usize> for DetailValue {
    fn from(v: usize) -> Self {
        DetailValue::Count(v as u64)
    }
}

impl From<u64> for DetailValue {
    fn from(v: u64) -> Self {
        DetailValue::Count(v)
    }
}

impl From<&str> for DetailValue {
    fn from(v: &str) -> Self {
        DetailValue::Text(v.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(v: String) -> Self {
        DetailValue::Text(v)
    }
}

impl From<Vec<String>> for DetailValue {
    fn from(v: Vec<String>) -> Self {
        DetailValue::List(v)
    }
}

pub type Details = BTreeMap<String, DetailValue>;

/// Immutable error record produced by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{kind}: {message}")]
pub struct EngineError {
    pub id: Uuid,
    pub kind: ErrorKind,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl EngineError {
    pub fn notification(&self) -> Notification {
        Notification {
            title: notification_title(self.kind).to_string(),
            description: self.message.clone(),
            severity: self.severity,
        }
    }
}

/// What the notification layer needs to render a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

pub(crate) fn notification_title(kind: ErrorKind) -> &'static str {
    match kind.category() {
        ErrorCategory::Validation => "Validation Error",
        ErrorCategory::Processing => "Processing Error",
        ErrorCategory::Resource => "File Error",
        ErrorCategory::Security => "Security Warning",
        ErrorCategory::System => "System Error",
    }
}

/// Optional overrides for [`ErrorRegistry::create_error`].
#[derive(Debug, Clone, Default)]
pub struct ErrorOptions {
    pub message: Option<String>,
    pub severity: Option<Severity>,
    pub details: Option<Details>,
    pub context: Option<String>,
}

impl ErrorOptions {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn details(mut self, details: Details) -> Self {
        self.details = Some(details);
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&EngineError) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

/// Constructs error records and keeps an observable log of them.
///
/// Share it by `Arc` with whatever needs to log or subscribe; call
/// [`ErrorRegistry::shutdown`] when the owner is done with it.
#[derive(Default)]
pub struct ErrorRegistry {
    log: Mutex<Vec<EngineError>>,
    listeners: Mutex<Listeners>,
}

impl ErrorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record for `kind`, append it to the log and notify listeners.
    pub fn create_error(&self, kind: ErrorKind, options: ErrorOptions) -> EngineError {
        let requested = options.severity.unwrap_or_else(|| kind.default_severity());
        let error = EngineError {
            id: Uuid::new_v4(),
            kind,
            message: options
                .message
                .unwrap_or_else(|| kind.default_message().to_string()),
            severity: requested.max(kind.minimum_severity()),
            details: options.details,
            context: options.context,
            timestamp: Utc::now(),
        };
        self.record(error.clone());
        error
    }

    /// Like [`create_error`](Self::create_error) but from a wire code.
    /// Unknown codes fall back to `PROCESSING_FAILED` with the generic message.
    pub fn create_error_for_code(&self, code: &str, mut options: ErrorOptions) -> EngineError {
        match code.parse::<ErrorKind>() {
            Ok(kind) => self.create_error(kind, options),
            Err(_) => {
                if options.message.is_none() {
                    options.message = Some(GENERIC_ERROR_MESSAGE.to_string());
                }
                options.context.get_or_insert_with(|| format!("unrecognized code {code}"));
                self.create_error(ErrorKind::ProcessingFailed, options)
            }
        }
    }

    fn record(&self, error: EngineError) {
        lock(&self.log).push(error.clone());

        // Snapshot so a listener may subscribe or unsubscribe without deadlocking.
        let listeners: Vec<(ListenerId, Listener)> = lock(&self.listeners).entries.clone();
        for (id, listener) in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(&error)));
            if outcome.is_err() {
                tracing::warn!(listener = id.0, kind = %error.kind, "error listener panicked");
            }
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&EngineError) + Send + Sync + 'static,
    {
        let mut listeners = lock(&self.listeners);
        let id = ListenerId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the listener was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.entries.len();
        listeners.entries.retain(|(lid, _)| *lid != id);
        listeners.entries.len() != before
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }

    pub fn snapshot(&self) -> Vec<EngineError> {
        lock(&self.log).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.log).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.log).clear();
    }

    /// Take every logged error, leaving the log empty.
    pub fn drain(&self) -> Vec<EngineError> {
        std::mem::take(&mut *lock(&self.log))
    }

    /// Drain the log and drop every listener.
    pub fn shutdown(&self) -> Vec<EngineError> {
        lock(&self.listeners).entries.clear();
        self.drain()
    }
}

impl fmt::Debug for ErrorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRegistry")
            .field("logged", &self.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// A panicking listener runs outside the lock, so poisoning only happens if
// a push itself panicked; the data is still usable.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
