//! ForgeText CLI - Bridge interface for the presentation layer
//!
//! Commands: profiles, validate, process
//! Outputs JSON to stdout, logs to stderr
//! Exit codes: 0 ok, 1 usage/IO error, 2 invalid input, 3 security violation

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use forgetext_core::{
    ErrorKind, ErrorRegistry, Format, PipelineError, ProcessRequest,
    ProcessingPipeline, ProfileRegistry, ValidationResult, DEFAULT_MAX_FILE_SIZE_MB,
};

const EXIT_INVALID: u8 = 2;
const EXIT_SECURITY: u8 = 3;

#[derive(Parser)]
#[command(name = "forgetext-cli")]
#[command(about = "ForgeText CLI - Text Production Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to profiles directory
    #[arg(short, long, default_value = "profiles")]
    profiles_dir: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List available profiles
    Profiles,

    /// Validate input without transforming it
    Validate {
        /// json, xml, html, css, js or sql
        #[arg(short, long)]
        format: String,

        /// Input file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Validate and transform input with a profile
    Process {
        /// Profile ID, e.g. css-minify
        #[arg(short, long)]
        profile: String,

        /// Input file (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let profiles = match ProfileRegistry::load_from_dir(&cli.profiles_dir) {
        Ok(p) => p,
        Err(e) => {
            print_json(&serde_json::json!({"success": false, "error": e.to_string()}));
            return ExitCode::FAILURE;
        }
    };

    let errors = Arc::new(ErrorRegistry::new());
    let pipeline = ProcessingPipeline::new(profiles, errors.clone());

    let code = match cli.command {
        Commands::Profiles => {
            let profiles: Vec<_> = pipeline
                .list_profiles()
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "id": p.id,
                        "name": p.name,
                        "version": p.profile_version,
                        "format": p.format,
                        "mode": p.mode,
                        "deprecated": p.deprecated,
                    })
                })
                .collect();
            print_json(&profiles);
            ExitCode::SUCCESS
        }

        Commands::Validate { format, input } => {
            let format: Format = match format.parse() {
                Ok(f) => f,
                Err(e) => {
                    let result = ValidationResult::failure_with(
                        ErrorKind::UnsupportedFormat,
                        e.to_string(),
                    );
                    print_json(&result);
                    return ExitCode::from(EXIT_INVALID);
                }
            };
            let text = match read_input(input.as_deref()) {
                Ok(t) => t,
                Err(result) => {
                    print_json(&result);
                    return ExitCode::FAILURE;
                }
            };

            let result = pipeline.validate_input(format, &text, DEFAULT_MAX_FILE_SIZE_MB);
            print_json(&result);
            exit_for(&result)
        }

        Commands::Process { profile, input } => {
            let text = match read_input(input.as_deref()) {
                Ok(t) => t,
                Err(result) => {
                    print_json(&result);
                    return ExitCode::FAILURE;
                }
            };
            let request = ProcessRequest {
                profile_id: profile,
                text,
            };

            match pipeline.process(&request) {
                Ok(output) => {
                    print_json(&serde_json::json!({"success": true, "result": output}));
                    ExitCode::SUCCESS
                }
                Err(PipelineError::ValidationFailed(result)) => {
                    print_json(&serde_json::json!({"success": false, "validation": result}));
                    exit_for(&result)
                }
                Err(e) => {
                    print_json(&serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                        "errorCode": e.kind(),
                    }));
                    ExitCode::from(EXIT_INVALID)
                }
            }
        }
    };

    for error in errors.shutdown() {
        tracing::debug!(kind = %error.kind, severity = %error.severity, "{}", error.message);
    }
    code
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(path: Option<&Path>) -> Result<String, ValidationResult> {
    let read = match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        }
    };
    read.map_err(|e| {
        ValidationResult::failure_with(
            ErrorKind::FileReadError,
            format!("{}: {}", ErrorKind::FileReadError.default_message(), e),
        )
    })
}

fn exit_for(result: &ValidationResult) -> ExitCode {
    if result.is_valid() {
        ExitCode::SUCCESS
    } else if result.is_security_violation() {
        ExitCode::from(EXIT_SECURITY)
    } else {
        ExitCode::from(EXIT_INVALID)
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => println!(r#"{{"success": false, "error": "{}"}}"#, e),
    }
}
