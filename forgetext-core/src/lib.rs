//! ForgeText Core - Text Production Compiler
//!
//! # The Rules (Non-Negotiable)
//! 1. Validation Before Transformation
//! 2. Validators Never Fail, They Report
//! 3. Security Findings Are Never Downgraded
//! 4. Transformations Are Pure
//! 5. Every Error Has a Stable Kind

pub mod errors;
pub mod validation;
pub mod transform;
pub mod json_layout;
pub mod presets;
pub mod report;
pub mod hashing;
pub mod profiles;
pub mod pipeline;

pub use errors::{
    DetailValue, Details, EngineError, ErrorCategory, ErrorKind, ErrorOptions, ErrorRegistry,
    ListenerId, Locale, Notification, Severity,
};
pub use validation::{
    validate, validate_file_size, validate_not_empty, Format, FormatValidator, ValidationResult,
    Validator, DEFAULT_MAX_FILE_SIZE_MB,
};
pub use transform::{format, minify, Comments, HeldSpans, Lexicon, MinifyStep, TransformError};
pub use presets::Mode;
pub use report::{format_bytes, SizeReport};
pub use hashing::{canonical_json, compute_job_hash, sha256_hex};
pub use profiles::{Profile, ProfileId, ProfileRegistry};
pub use pipeline::{ExportArtifact, PipelineError, ProcessRequest, ProcessedOutput, ProcessingPipeline};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
