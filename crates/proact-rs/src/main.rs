//! Run a tool-call plan through the orchestration engine and print the trace.
//!
//! # Examples
//!
//! ```sh
//! # Canned responses for every tool
//! proact run --plan plan.json --mode sandbox
//!
//! # Pipe raw model output and pull out its `## Tool Calling:` section
//! cat response.md | proact run --model-output
//!
//! # Seed memory and print trace plus final memory as JSON
//! proact run --plan plan.json --memory memory.json --json -vv
//!
//! # List registered tools
//! proact tools --mode live
//! ```

use clap::{Parser, Subcommand};
use proact_rs::agent::{LoggingHandler, Memory, OrchestratorConfig, ToolMode};
use proact_rs::plan::{load_plan, parse_model_output, parse_plan};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Tool-orchestration engine for proactive agents.
///
/// The tool mode defaults to APP_MODE (live when unset); LOCATIONIQ_API_KEY
/// enables fine-grained reverse geocoding in live mode.
#[derive(Parser)]
#[command(name = "proact", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a plan and print its trace
    Run(RunArgs),
    /// List the registered tools
    Tools {
        /// Tool implementations to use
        #[arg(long)]
        mode: Option<ToolMode>,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Plan file (JSON or Python-literal list); stdin when omitted
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Treat the input as raw model output and extract its tool list
    #[arg(long)]
    model_output: bool,

    /// JSON object used to seed memory
    #[arg(long)]
    memory: Option<PathBuf>,

    /// Tool implementations to use
    #[arg(long)]
    mode: Option<ToolMode>,

    /// Validate arguments against tool schemas before dispatch
    #[arg(long)]
    validate_args: bool,

    /// Print `{trace, memory}` instead of the trace alone
    #[arg(long)]
    json: bool,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

fn config_for(mode: Option<ToolMode>) -> OrchestratorConfig {
    let config = OrchestratorConfig::from_env();
    match mode {
        Some(mode) => config.with_mode(mode),
        None => config,
    }
}

fn read_memory(path: &Path) -> Result<Memory, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read memory file '{}': {e}", path.display()))?;
    Memory::from_json(&text)
        .map_err(|e| format!("memory file '{}' is not a JSON object: {e}", path.display()))
}

fn read_plan(args: &RunArgs) -> Result<Vec<serde_json::Value>, String> {
    if let Some(path) = &args.plan {
        return load_plan(path, args.model_output).map_err(|e| e.to_string());
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .map_err(|e| format!("failed to read stdin: {e}"))?;
    let plan = if args.model_output {
        parse_model_output(&text)
    } else {
        parse_plan(&text)
    };
    plan.map_err(|e| e.to_string())
}

async fn run(args: RunArgs) -> Result<String, String> {
    let config = config_for(args.mode).with_validate_args(args.validate_args);
    let plan = read_plan(&args)?;
    let memory = match &args.memory {
        Some(path) => read_memory(path)?,
        None => Memory::new(),
    };

    let registry = config.build_registry().map_err(|e| e.to_string())?;
    let normalizers = config.build_normalizers();
    let outcome = config
        .scheduler(&registry, &normalizers)
        .with_event_handler(&LoggingHandler)
        .run(&plan, memory)
        .await;

    let rendered = if args.json {
        serde_json::to_string_pretty(&outcome)
    } else {
        serde_json::to_string_pretty(&outcome.trace)
    };
    rendered
        .map(|s| s + "\n")
        .map_err(|e| format!("failed to serialize outcome: {e}"))
}

fn list_tools(mode: Option<ToolMode>) -> Result<String, String> {
    let config = config_for(mode);
    let registry = config.build_registry().map_err(|e| e.to_string())?;

    let mut out = format!("Mode: {}\n", config.mode);
    for (module, tools) in registry.modules() {
        out.push_str(&format!("\n[{module}]\n"));
        for name in tools {
            let Some(def) = registry.definition(name) else {
                continue;
            };
            out.push_str(&format!(
                "  {name}({}): {}\n",
                def.parameter_names().join(", "),
                def.summary()
            ));
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Tools { mode } => list_tools(mode),
    };

    match result {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
