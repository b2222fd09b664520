//! Proto Rules CLI
//!
//! Command-line interface for compiling schemas and validating payloads.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use proto_rules::{
    compile_schema, load_payload, load_schema, CompileOptions, ValidateError, ValidatorRegistry,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proto-rules")]
#[command(about = "Compile protobuf-style schemas into validators and check payloads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema and print its rule graph
    Compile {
        /// Parsed schema (JSON)
        schema: PathBuf,

        /// Only print this top-level message
        #[arg(long, short)]
        message: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a payload against a message of a schema
    Validate {
        /// Payload file to validate
        payload: PathBuf,

        /// Parsed schema (JSON)
        #[arg(long)]
        schema: PathBuf,

        /// Top-level message to validate against
        #[arg(long, short)]
        message: String,

        /// Value treated as "not provided" (JSON, or a bare string); repeatable
        #[arg(long = "empty", value_name = "VALUE")]
        empty: Vec<String>,

        /// Let undeclared keys pass through
        #[arg(long)]
        allow_unknown: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            schema,
            message,
            output,
            pretty,
        } => run_compile(&schema, message.as_deref(), output, pretty),

        Commands::Validate {
            payload,
            schema,
            message,
            empty,
            allow_unknown,
            json,
        } => run_validate(ValidateArgs {
            payload,
            schema,
            message,
            empty,
            allow_unknown,
            json_output: json,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn compile(path: &Path, options: &CompileOptions) -> Result<ValidatorRegistry, ValidateError> {
    let schema = load_schema(path)?;
    Ok(compile_schema(&schema, options)?)
}

fn run_compile(
    schema_path: &Path,
    message: Option<&str>,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let registry = compile(schema_path, &CompileOptions::new()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let described = match message {
        Some(name) => match registry.get(name) {
            Some(validator) => validator.describe(),
            None => {
                eprintln!("Error: schema has no top-level message named '{}'", name);
                return Err(2);
            }
        },
        None => registry.describe(),
    };

    let json_output = if pretty {
        serde_json::to_string_pretty(&described)
    } else {
        serde_json::to_string(&described)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

struct ValidateArgs {
    payload: PathBuf,
    schema: PathBuf,
    message: String,
    empty: Vec<String>,
    allow_unknown: bool,
    json_output: bool,
}

fn run_validate(args: ValidateArgs) -> Result<(), u8> {
    let ValidateArgs {
        payload: payload_path,
        schema,
        message,
        empty,
        allow_unknown,
        json_output,
    } = args;

    let options = CompileOptions::new()
        .empty_equivalents(empty.iter().map(|raw| parse_empty(raw)))
        .allow_unknown(allow_unknown);

    let payload = load_payload(&payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;

    let result =
        compile(&schema, &options).and_then(|registry| registry.validate(&message, &payload));

    match result {
        Ok(value) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": true,
                    "value": value
                });
                println!("{}", output);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// `--empty '""'` is the empty string; `--empty none` is the string "none".
fn parse_empty(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "error": msg
        });
        println!("{}", output);
    } else {
        eprintln!("Error: {}", msg);
    }
}
