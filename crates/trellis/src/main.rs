//! Trellis route table tool.
//!
//! Validates route tables and shows how requests resolve against them.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use trellis_lib::{resolve, RouteTable, RouteTableError};
use trellis_telemetry::{init_logging, log_startup, LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "trellis", about = "Trellis route table tool", version)]
struct Cli {
    /// Log level (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log format (json or pretty).
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate route table file(s).
    ///
    /// Registers every route of each table into a fresh router and reports
    /// every rejected route with its code (R1000-R1010).
    Validate {
        /// Route table file(s) (YAML).
        #[arg(short, long, required = true, num_args = 1..)]
        routes: Vec<String>,

        /// Output format (text or json).
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show how a request resolves against a route table.
    Resolve {
        /// Route table file (YAML).
        #[arg(short, long)]
        routes: String,

        /// Request method.
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path.
        #[arg(short, long)]
        path: String,

        /// Output format (text or json).
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Serialize)]
struct ValidationResult {
    file: String,
    valid: bool,
    routes: usize,
    errors: Vec<ValidationIssue>,
}

#[derive(Serialize)]
struct ValidationIssue {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

impl From<&RouteTableError> for ValidationIssue {
    fn from(err: &RouteTableError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            location: err.location(),
        }
    }
}

#[derive(Serialize)]
struct ValidationSummary {
    total: usize,
    valid: usize,
    invalid: usize,
}

fn validate_file(file: &str) -> ValidationResult {
    let (routes, errors) = match RouteTable::load(Path::new(file)) {
        Ok(table) => (table.routes.len(), table.check()),
        Err(err) => (0, vec![err]),
    };

    ValidationResult {
        file: file.to_string(),
        valid: errors.is_empty(),
        routes,
        errors: errors.iter().map(ValidationIssue::from).collect(),
    }
}

/// Run the validate command.
fn run_validate(files: &[String], output_format: &str) -> anyhow::Result<ExitCode> {
    let results: Vec<ValidationResult> = files.iter().map(|f| validate_file(f)).collect();
    let valid_count = results.iter().filter(|r| r.valid).count();
    let total = results.len();

    if output_format == "json" {
        let output = serde_json::json!({
            "results": results,
            "summary": ValidationSummary {
                total,
                valid: valid_count,
                invalid: total - valid_count,
            },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for result in &results {
            if result.valid {
                eprintln!("✓ {} is valid ({} route(s))", result.file, result.routes);
            } else {
                eprintln!("✗ {} has {} error(s)", result.file, result.errors.len());
            }

            for err in &result.errors {
                match &err.location {
                    Some(loc) => eprintln!("  {} [{}]: {}", err.code, loc, err.message),
                    None => eprintln!("  {}: {}", err.code, err.message),
                }
            }
        }

        eprintln!();
        eprintln!(
            "validated {} route table(s): {} valid, {} invalid",
            total,
            valid_count,
            total - valid_count
        );
    }

    if valid_count == total {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

/// Run the resolve command.
fn run_resolve(
    routes: &str,
    method: &str,
    path: &str,
    output_format: &str,
) -> anyhow::Result<ExitCode> {
    let table = RouteTable::load(Path::new(routes))
        .with_context(|| format!("failed to load {}", routes))?;
    let router = table
        .build()
        .with_context(|| format!("failed to register routes from {}", routes))?;

    let method = method.to_ascii_uppercase();
    let resolution = resolve(&router, &method, path);

    if output_format == "json" {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        println!("{}", resolution);
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_format = LogFormat::parse(&cli.log_format).unwrap_or_default();
    let telemetry = TelemetryConfig::new()
        .with_log_level(cli.log_level.as_str())
        .with_log_format(log_format);
    if let Err(e) = init_logging(&telemetry) {
        eprintln!("warning: {}", e);
    }

    log_startup!(
        service = %telemetry.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "trellis starting"
    );

    let result = match cli.command {
        Commands::Validate { routes, format } => run_validate(&routes, &format),
        Commands::Resolve {
            routes,
            method,
            path,
            format,
        } => run_resolve(&routes, &method, &path, &format),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
