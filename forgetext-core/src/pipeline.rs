//! Processing Pipeline - Single Entry Point
//!
//! CRITICAL: process MUST validate internally. No transformation runs on
//! input that failed validation.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::{ErrorKind, ErrorOptions, ErrorRegistry};
use crate::hashing::{compute_job_hash, sha256_hex};
use crate::presets::{self, Mode};
use crate::profiles::{Profile, ProfileRegistry};
use crate::report::SizeReport;
use crate::transform::TransformError;
use crate::validation::{validate_file_size, Format, ValidationResult, Validator};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Validation failed: {}", .0.message().unwrap_or("invalid input"))]
    ValidationFailed(ValidationResult),

    #[error("Profile {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version string: {0}")]
    InvalidVersion(#[from] semver::Error),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// The stable kind callers surface for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::ValidationFailed(result) => {
                result.error_kind().unwrap_or(ErrorKind::InvalidFormat)
            }
            PipelineError::Transform(e) => e.kind(),
            PipelineError::Serialization(_) => ErrorKind::ConversionFailed,
            PipelineError::ProfileNotFound(_)
            | PipelineError::EngineVersionMismatch(..)
            | PipelineError::InvalidVersion(_) => ErrorKind::ProcessingFailed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub profile_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedOutput {
    pub id: String,
    pub profile_id: String,
    pub profile_version: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub job_hash: String,
    pub validation: ValidationResult,
    pub size_report: SizeReport,
    pub output: String,
    pub artifact: ExportArtifact,
}

/// What the file-export layer needs to offer the output as a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    pub filename: String,
    pub extension: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub sha256: String,
    pub data_base64: String,
}

impl ExportArtifact {
    pub fn new(format: Format, mode: Mode, output: &str) -> Self {
        let stem = match mode {
            Mode::Minify => "output.min",
            Mode::Format => "output",
        };
        Self {
            filename: format!("{}.{}", stem, format.extension()),
            extension: format.extension().to_string(),
            mime_type: format.mime_type().to_string(),
            size_bytes: output.len(),
            sha256: sha256_hex(output.as_bytes()),
            data_base64: base64::engine::general_purpose::STANDARD.encode(output.as_bytes()),
        }
    }
}

/// The processing pipeline - single entry point for validate and transform
pub struct ProcessingPipeline {
    profiles: ProfileRegistry,
    validator: Validator,
    errors: Arc<ErrorRegistry>,
}

impl ProcessingPipeline {
    pub fn new(profiles: ProfileRegistry, errors: Arc<ErrorRegistry>) -> Self {
        Self {
            profiles,
            validator: Validator::new(),
            errors,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn errors(&self) -> &Arc<ErrorRegistry> {
        &self.errors
    }

    pub fn list_profiles(&self) -> Vec<&Profile> {
        self.profiles.list()
    }

    pub fn get_profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    /// Validate `text` as `format`, logging any failure to the registry.
    pub fn validate_text(&self, format: Format, text: &str) -> ValidationResult {
        let result = self.validator.validate(format, text);
        self.record_failure(&result, format.as_str());
        result
    }

    /// Size ceiling then format validation, logging any failure.
    pub fn validate_input(
        &self,
        format: Format,
        text: &str,
        max_file_size_mb: u64,
    ) -> ValidationResult {
        self.validate_sized(format, text, max_file_size_mb, format.as_str())
    }

    /// Size ceiling then format validation, as configured by the profile.
    ///
    /// This is the ONLY validation entry point for profile-driven work.
    pub fn validate_for_profile(
        &self,
        profile_id: &str,
        text: &str,
    ) -> Result<ValidationResult, PipelineError> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        let profile = self
            .profiles
            .get(profile_id)
            .ok_or_else(|| PipelineError::ProfileNotFound(profile_id.to_string()))?;

        Ok(self.validate_sized(profile.format, text, profile.max_file_size_mb, &profile.id))
    }

    fn validate_sized(
        &self,
        format: Format,
        text: &str,
        max_file_size_mb: u64,
        context: &str,
    ) -> ValidationResult {
        let size = validate_file_size(text.len() as u64, max_file_size_mb);
        let result = if size.is_valid() {
            self.validator.validate(format, text)
        } else {
            size
        };
        self.record_failure(&result, context);
        result
    }

    /// Validate, transform and report.
    ///
    /// CRITICAL: This ALWAYS calls validate_for_profile first. No bypass.
    pub fn process(&self, request: &ProcessRequest) -> Result<ProcessedOutput, PipelineError> {
        self.run(request).map_err(|error| {
            // Validation failures were logged when they were detected.
            if !matches!(error, PipelineError::ValidationFailed(_)) {
                self.errors.create_error(
                    error.kind(),
                    ErrorOptions::default()
                        .message(error.to_string())
                        .context(request.profile_id.clone()),
                );
            }
            error
        })
    }

    fn run(&self, request: &ProcessRequest) -> Result<ProcessedOutput, PipelineError> {
        let profile = self
            .profiles
            .get(&request.profile_id)
            .ok_or_else(|| PipelineError::ProfileNotFound(request.profile_id.clone()))?;

        self.check_engine_version(profile)?;

        // MANDATORY: validation always runs before any transformation.
        let validation = self.validate_for_profile(&request.profile_id, &request.text)?;
        if !validation.is_valid() {
            return Err(PipelineError::ValidationFailed(validation));
        }

        let output = presets::apply(profile.format, profile.mode, &request.text)?;
        let size_report = SizeReport::compute(&request.text, &output);
        let job_hash = compute_job_hash(
            &profile.id,
            &profile.profile_version,
            request,
            ENGINE_VERSION,
        )?;

        tracing::info!(
            profile = %profile.id,
            original_bytes = size_report.original_bytes,
            output_bytes = size_report.output_bytes,
            saved = size_report.saved_percentage,
            "processed input"
        );

        Ok(ProcessedOutput {
            id: Uuid::new_v4().to_string(),
            profile_id: profile.id.clone(),
            profile_version: profile.profile_version.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            job_hash,
            validation,
            size_report,
            artifact: ExportArtifact::new(profile.format, profile.mode, &output),
            output,
        })
    }

    fn check_engine_version(&self, profile: &Profile) -> Result<(), PipelineError> {
        let engine = semver::Version::parse(ENGINE_VERSION)?;
        let required = semver::Version::parse(&profile.engine_min_version)?;

        if engine < required {
            return Err(PipelineError::EngineVersionMismatch(
                profile.id.clone(),
                profile.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }
        Ok(())
    }

    fn record_failure(&self, result: &ValidationResult, context: &str) {
        let Some(kind) = result.error_kind() else {
            return;
        };
        let mut options = ErrorOptions::default().context(context);
        if let Some(message) = result.message() {
            options = options.message(message);
        }
        if let Some(details) = result.details() {
            options = options.details(details.clone());
        }
        let error = self.errors.create_error(kind, options);
        if kind.is_security() {
            tracing::warn!(%kind, context, "blocked input: {}", error.message);
        }
    }
}

impl Default for ProcessingPipeline {
    fn default() -> Self {
        Self::new(ProfileRegistry::builtin(), Arc::new(ErrorRegistry::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(profile_id: &str, text: &str) -> ProcessRequest {
        ProcessRequest {
            profile_id: profile_id.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_artifact_metadata() {
        let artifact = ExportArtifact::new(Format::Css, Mode::Minify, "a{}");
        assert_eq!(artifact.filename, "output.min.css");
        assert_eq!(artifact.mime_type, "text/css");
        assert_eq!(artifact.size_bytes, 3);
        assert_eq!(artifact.data_base64, "YXt9");
    }

    #[test]
    fn test_pipeline_error_kinds() {
        let pipeline = ProcessingPipeline::default();
        let err = pipeline.process(&request("nope", "x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessingFailed);

        let err = pipeline
            .process(&request("sql-minify", "SELECT 1; DROP TABLE t"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecurityViolation);
    }

    #[test]
    fn test_engine_version_gate() {
        let mut profiles = ProfileRegistry::builtin();
        let mut future = Profile::builtin(Format::Json, Mode::Minify);
        future.id = "json-next".to_string();
        future.engine_min_version = "99.0.0".to_string();
        profiles.register(future);

        let pipeline = ProcessingPipeline::new(profiles, Arc::new(ErrorRegistry::new()));
        let err = pipeline.process(&request("json-next", "{}")).unwrap_err();
        assert!(matches!(err, PipelineError::EngineVersionMismatch(..)));
        assert_eq!(pipeline.errors().len(), 1);
    }

    #[test]
    fn test_size_ceiling_checked_before_format() {
        let mut profiles = ProfileRegistry::new();
        let mut tiny = Profile::builtin(Format::Json, Mode::Minify);
        tiny.max_file_size_mb = 0;
        profiles.register(tiny);

        let pipeline = ProcessingPipeline::new(profiles, Arc::new(ErrorRegistry::new()));
        let result = pipeline.validate_for_profile("json-minify", "{}").unwrap();
        assert_eq!(result.error_kind(), Some(ErrorKind::FileTooLarge));
    }

    #[test]
    fn test_validate_input_records_size_failures() {
        let pipeline = ProcessingPipeline::default();
        let text = "x".repeat(1024 * 1024 + 1);

        let result = pipeline.validate_input(Format::Css, &text, 1);
        assert_eq!(result.error_kind(), Some(ErrorKind::FileTooLarge));

        let logged = pipeline.errors().snapshot();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].kind, ErrorKind::FileTooLarge);
        assert_eq!(logged[0].context.as_deref(), Some("css"));
    }
}
