//! Solver CLI - JSON validation front end
//!
//! Commands: schemas, validate, split
//! Outputs JSON to stdout, diagnostics to stderr
//! Returns 2 on validation failure

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use solver_core::{
    format::ListFormat, Format, Input, SchemaRegistry, SeverityMask, StatusLog, ValidationEngine,
};

#[derive(Parser)]
#[command(name = "solver-cli")]
#[command(about = "Solver CLI - validate untrusted input against schemas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to schemas directory
    #[arg(short, long, default_value = "schemas")]
    schemas_dir: PathBuf,

    /// Severities to record: "all", "none" or e.g. "error,warning"
    #[arg(short, long, default_value = "all")]
    mask: SeverityMask,

    /// Verbose diagnostics on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available schemas
    Schemas,

    /// Validate a payload
    Validate {
        /// Schema ID
        #[arg(short = 'S', long)]
        schema: String,

        /// JSON payload
        #[arg(short, long)]
        payload: String,
    },

    /// Split a delimited string into a list
    Split {
        /// Delimiter characters
        #[arg(short, long, default_value = ",;\n")]
        delimiters: String,

        /// Text to split
        #[arg(short, long)]
        input: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Schemas => {
            let registry = match SchemaRegistry::load_from_dir(&cli.schemas_dir) {
                Ok(r) => r,
                Err(e) => {
                    print_json(&serde_json::json!({"error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };
            let schemas: Vec<_> = registry
                .list()
                .iter()
                .map(|s| serde_json::json!({
                    "id": s.id,
                    "name": s.name,
                    "version": s.schema_version,
                    "deprecated": s.deprecated,
                }))
                .collect();

            print_json(&serde_json::Value::Array(schemas));
            ExitCode::SUCCESS
        }

        Commands::Validate { schema, payload } => {
            let registry = match SchemaRegistry::load_from_dir(&cli.schemas_dir) {
                Ok(r) => r,
                Err(e) => {
                    print_json(&serde_json::json!({"valid": false, "error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };
            let engine = ValidationEngine::new(registry).with_mask(cli.mask);

            let payload: serde_json::Value = match serde_json::from_str(&payload) {
                Ok(p) => p,
                Err(e) => {
                    print_json(&serde_json::json!({
                        "valid": false,
                        "error": format!("Invalid payload: {}", e),
                    }));
                    return ExitCode::FAILURE;
                }
            };

            match engine.validate_payload(&schema, payload) {
                Ok(report) => {
                    match serde_json::to_value(&report) {
                        Ok(v) => print_json(&v),
                        Err(e) => eprintln!("Failed to encode report: {}", e),
                    }
                    if report.valid {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2)
                    }
                }
                Err(e) => {
                    print_json(&serde_json::json!({"valid": false, "error": e.to_string()}));
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Split { delimiters, input } => {
            let mut log = StatusLog::new(cli.mask);
            let format = ListFormat::new(delimiters);
            match format.extract(&Input::from(input), &mut log, None) {
                Some(list) => {
                    print_json(&list);
                    ExitCode::SUCCESS
                }
                None => {
                    print_json(&serde_json::json!({"events": log.events()}));
                    ExitCode::from(2)
                }
            }
        }
    }
}
