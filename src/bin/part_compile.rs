//! Part Compile Binary
//!
//! Compiles a part description into its build order and prints the
//! `CompileResult` as JSON on stdout. On failure the `{code, message}` error
//! report is printed instead and the process exits with status 1.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PART_UNITS`: unit system for parts that declare none (default: mm)
//! - `PART_DATA_ONLY_DIAGNOSTICS`: emit the constraints/assertions diagnostic (default: true)
//! - `RUST_LOG`: Log level filter (default: part_compile=info,part_graph_kernel=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! Logs go to stderr so stdout stays machine-readable.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin part_compile -- part.json [overrides.json]
//! ```

use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use part_graph_kernel::{
    CompileError, CompileOptions, ErrorReport, ParamOverrides, Part, PartCompiler, ValidationError,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "part_compile=info,part_graph_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn read_input(path: &Path) -> Result<String, CompileError> {
    std::fs::read_to_string(path).map_err(|e| {
        ValidationError::Parse(format!("cannot read {}: {e}", path.display())).into()
    })
}

fn load_overrides(path: &Path) -> Result<ParamOverrides, CompileError> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        ValidationError::Parse(format!("invalid overrides {}: {e}", path.display())).into()
    })
}

fn run(part_path: &Path, overrides_path: Option<&Path>) -> Result<String, CompileError> {
    let part = Part::from_json(&read_input(part_path)?)?;
    let overrides = overrides_path.map(load_overrides).transpose()?;

    let compiler = PartCompiler::new(CompileOptions::from_env());
    let result = compiler.compile(&part, overrides.as_ref())?;

    for diagnostic in &result.diagnostics {
        info!(code = %diagnostic.code, "{}", diagnostic.message);
    }
    serde_json::to_string_pretty(&result)
        .map_err(|e| ValidationError::Parse(format!("cannot encode result: {e}")).into())
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (part_path, overrides_path) = match args.as_slice() {
        [part] => (Path::new(part), None),
        [part, overrides] => (Path::new(part), Some(Path::new(overrides))),
        _ => {
            eprintln!("usage: part_compile <part.json> [overrides.json]");
            return ExitCode::from(2);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        part = %part_path.display(),
        "Compiling part"
    );

    match run(part_path, overrides_path) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let report: ErrorReport = err.report();
            error!(code = %report.code, "{}", report.message);
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(_) => println!("{report}"),
            }
            ExitCode::FAILURE
        }
    }
}
