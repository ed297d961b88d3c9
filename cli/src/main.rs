//! CLI entrypoint for llmux
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{bail, Result};
use clap::Parser;
use llmux_application::{AdapterSetup, ChatResult, MultiModelOrchestrator, ToolRouter};
use llmux_domain::{filter_mcp_servers, ConfiguredModel, ModelSpec, Prompt};
use llmux_infrastructure::{
    config, HttpLlmGateway, LocalToolSource, McpConnector, ModelRegistry, Settings,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Ask one prompt across one or more models
#[derive(Parser, Debug)]
#[command(name = "llmux", version, about)]
struct Cli {
    /// The prompt to send (JSON object form carries text/image fields)
    question: Option<String>,

    /// Model slot, repeatable; `name` or `name=role` (e.g. `gpt-4o=optimist`)
    #[arg(short, long)]
    model: Vec<String>,

    /// Reduce all model answers into one consensus answer
    #[arg(long)]
    consensus: bool,

    /// Local tool definition file, repeatable
    #[arg(long = "tools")]
    tools: Vec<String>,

    /// Keep only tools whose name contains one of these substrings
    #[arg(long = "allowed-tools")]
    allowed_tools: Vec<String>,

    /// Drop tools whose name contains one of these substrings
    #[arg(long = "rejected-tools")]
    rejected_tools: Vec<String>,

    /// MCP server config file, repeatable
    #[arg(long = "mcp-config")]
    mcp_config: Vec<String>,

    /// Connect only these MCP servers (wins over --mcp-skip)
    #[arg(long = "mcp-use")]
    mcp_use: Vec<String>,

    /// Skip these MCP servers
    #[arg(long = "mcp-skip")]
    mcp_skip: Vec<String>,

    /// Model registry refresh interval in days (0 = always refresh)
    #[arg(long = "refresh-days", default_value_t = config::DEFAULT_REFRESH_DAYS)]
    refresh_days: u64,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_model(raw: &str) -> ConfiguredModel {
    match raw.split_once('=') {
        Some((name, role)) if !role.is_empty() => ConfiguredModel::new(name).with_role(role),
        _ => ConfiguredModel::new(raw),
    }
}

/// A question that parses as a JSON object becomes a structured prompt
/// (named text/image fields); anything else is plain text.
fn parse_prompt(question: &str) -> Prompt {
    let trimmed = question.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(prompt @ Prompt::Structured { .. }) = serde_json::from_str(trimmed) {
            return prompt;
        }
    }
    Prompt::text(question)
}

fn settings_from(cli: &Cli) -> Settings {
    let models = cli.model.iter().map(|m| parse_model(m)).collect();
    let mut settings = Settings::new(models);
    settings.tool_paths = cli.tools.clone();
    settings.allowed_tools = cli.allowed_tools.clone();
    settings.rejected_tools = cli.rejected_tools.clone();
    settings.consensus = cli.consensus;
    settings.refresh_days = cli.refresh_days;
    settings.provider_env = config::env::capture();

    let imported = cli
        .mcp_config
        .iter()
        .flat_map(|path| llmux_infrastructure::mcp::import_file(Path::new(path)))
        .collect();
    settings.mcp_servers = filter_mcp_servers(imported, &cli.mcp_use, &cli.mcp_skip);
    settings
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting llmux");

    let question = match &cli.question {
        Some(q) => q.clone(),
        None => bail!("A prompt is required"),
    };
    if cli.model.is_empty() {
        bail!("At least one --model is required");
    }

    let settings = settings_from(&cli);

    // Model registry: attach declared modalities to each configured slot,
    // re-querying the hosted model listing once the cache has expired
    let http = reqwest::Client::new();
    let registry =
        ModelRegistry::load(&http, &settings.provider_env, settings.refresh_days).await;
    let specs = registry.enrich(ModelSpec::parse_all(&settings.models));

    // Tool pool: local files first, then MCP servers; one status line per
    // attempted server goes to stderr
    let connector = McpConnector::connect_all(&settings.mcp_servers).await;
    if !settings.mcp_servers.is_empty() {
        connector.report();
    }

    let mut sources = connector.sources();
    let local = LocalToolSource::load(&settings.tool_paths);
    if !local.is_empty() {
        sources.insert(0, Arc::new(local));
    }
    let tool_router = Arc::new(
        ToolRouter::build(&sources, &settings.allowed_tools, &settings.rejected_tools).await,
    );

    // === Dependency Injection ===
    let gateway = Arc::new(HttpLlmGateway::new(
        settings.provider_env.clone(),
        Arc::clone(&tool_router),
    ));

    let setup = AdapterSetup::new(gateway, tool_router.tools().to_vec());
    let (manager, report) = setup.initialize(specs).await?;
    for (model, error) in &report.failed_models {
        eprintln!("Model {}: setup failed ({})", model, error);
    }

    let orchestrator =
        MultiModelOrchestrator::new(Arc::new(manager)).with_consensus(settings.consensus);

    let result = orchestrator.chat(&parse_prompt(&question)).await;
    match &result {
        ChatResult::Single(reply) => {
            println!("{}", reply.content);
            if cli.verbose > 0 {
                if let Some(usage) = &reply.usage {
                    eprintln!(
                        "tokens: {} in / {} out{}",
                        usage.input_tokens,
                        usage.output_tokens,
                        reply
                            .latency_ms
                            .map(|ms| format!(", {} ms", ms))
                            .unwrap_or_default()
                    );
                }
            }
        }
        ChatResult::Multi(response) => {
            println!("{}", response.combined_text());
            if cli.verbose > 0 && response.has_metrics() {
                for (outcome, usage) in response.outcomes.iter().zip(response.metrics()) {
                    if let Some(usage) = usage {
                        eprintln!(
                            "{}: {} in / {} out",
                            outcome.display_name, usage.input_tokens, usage.output_tokens
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
