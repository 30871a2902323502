//! tool-router CLI - builds plans and records telemetry over file-backed stores.
//!
//! State directory layout:
//!   tools.json        tool registry (tools + tenant enablement)
//!   metrics.json      metrics rows
//!   plans/<id>.json   built plans
//!   executions.jsonl  execution audit log

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tool_router::metrics::{FeedbackSignal, ToolExecutionEvent};
use tool_router::plan::RoutingTask;
use tool_router::store::{FileExecutionLog, FileMetricsStore, FilePlanStore, FileToolRegistry};
use tool_router::types::PlanId;
use tool_router::{Collaborators, Config, ToolRouter};

#[derive(Debug, Parser)]
#[command(name = "tool-router", version, about = "Score candidate tools and emit routing plans")]
struct Cli {
    /// Directory holding registry, metrics, plans and the audit log.
    #[arg(long, env = "TOOL_ROUTER_STATE_DIR", default_value = ".tool-router")]
    state_dir: PathBuf,

    /// Tool registry document (defaults to <state-dir>/tools.json).
    #[arg(long, env = "TOOL_ROUTER_REGISTRY")]
    registry: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long, env = "TOOL_ROUTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a plan for a task document (`-` reads stdin).
    Plan { task: PathBuf },
    /// Record a tool execution event document.
    RecordExecution { event: PathBuf },
    /// Record a feedback signal document.
    Feedback { signal: PathBuf },
    /// Print a stored plan.
    ShowPlan { plan_id: String },
    /// Print the configuration JSON schema.
    ConfigSchema,
}

fn read_input(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    }
}

fn load_config(path: Option<&Path>) -> tool_router::Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::ConfigSchema = cli.command {
        return print_json(&Config::json_schema());
    }

    let config = load_config(cli.config.as_deref())?;
    tool_router::observability::init_tracing_with(&config.observability);

    let state = &cli.state_dir;
    let registry = cli.registry.clone().unwrap_or_else(|| state.join("tools.json"));
    let collaborators = Collaborators::new(
        Arc::new(FileToolRegistry::new(registry)),
        Arc::new(FileMetricsStore::new(state.join("metrics.json"))),
        Arc::new(FilePlanStore::new(state.join("plans"))),
    )
    .with_execution_log(Arc::new(FileExecutionLog::new(state.join("executions.jsonl"))));
    let router = ToolRouter::new(&config, collaborators)?;

    match cli.command {
        Command::Plan { task } => {
            let task: RoutingTask = serde_json::from_str(&read_input(&task)?)?;
            print_json(&router.build_plan(&task).await?)
        }
        Command::RecordExecution { event } => {
            let event: ToolExecutionEvent = serde_json::from_str(&read_input(&event)?)?;
            print_json(&router.record_execution_telemetry(&event).await?)
        }
        Command::Feedback { signal } => {
            let signal: FeedbackSignal = serde_json::from_str(&read_input(&signal)?)?;
            print_json(&router.record_feedback_telemetry(&signal).await?)
        }
        Command::ShowPlan { plan_id } => {
            let plan_id = PlanId::from_string(plan_id)?;
            print_json(&router.get_plan(&plan_id).await?)
        }
        Command::ConfigSchema => print_json(&Config::json_schema()),
    }
}
