//! CLI command definitions and dispatch.

pub mod generate;
pub mod models;
pub mod policy;
pub mod quota;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use genway_core::{AdapterRegistry, BackendKind, GenwayConfig};

const BANNER: &str = r#"
   genway
   Tier-aware AI generation with quotas and fallback.
"#;

/// genway CLI.
#[derive(Parser)]
#[command(
    name = "genway",
    version,
    about = "genway: tier-aware AI generation gateway",
    long_about = BANNER,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.genway/config.toml).
    #[arg(long, global = true, env = "GENWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Emit structured logs on stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one generation through the gateway.
    Generate(generate::GenerateArgs),

    /// List the model catalog.
    Models(models::ModelsArgs),

    /// Inspect and edit model selection overrides.
    #[command(subcommand)]
    Policy(policy::PolicyCommands),

    /// Show a user's quota usage.
    Quota(quota::QuotaArgs),

    /// Show configured backends and file locations.
    Status,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Execute the CLI command.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    if cli.verbose || config.telemetry.enabled {
        genway_core::telemetry::init_telemetry(&config.telemetry)?;
    }

    match cli.command {
        Commands::Generate(args) => generate::execute(args, &config, cli.output).await,
        Commands::Models(args) => models::execute(args, cli.output),
        Commands::Policy(cmd) => policy::execute(cmd, &config, cli.output).await,
        Commands::Quota(args) => quota::execute(args, &config, cli.output).await,
        Commands::Status => status(&config),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<GenwayConfig> {
    match path {
        Some(path) => {
            let mut config = GenwayConfig::from_file(path)?;
            config.apply_env();
            Ok(config)
        }
        None => GenwayConfig::load(),
    }
}

/// Print a serializable value as pretty JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status(config: &GenwayConfig) -> anyhow::Result<()> {
    println!("{BANNER}");

    let registry = AdapterRegistry::from_config(config);
    for kind in BackendKind::all() {
        let backend = config.backend(*kind);
        let state = if backend.usable_key().is_some() {
            "🟢 configured".to_string()
        } else {
            "⚪ no api key".dimmed().to_string()
        };
        let endpoint = backend.base_url.as_deref().unwrap_or("default endpoint");
        let model = registry
            .as_ref()
            .ok()
            .and_then(|r| r.get(*kind))
            .map(|b| b.default_model().to_string())
            .or_else(|| backend.default_model.clone())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<15}{} {} {}",
            format!("{kind}:"),
            state,
            model.cyan(),
            endpoint.dimmed()
        );
    }
    println!("  {:<15}{}", "Default:", config.default_backend);

    match registry {
        Ok(_) => println!("  {} Gateway ready", "✓".green().bold()),
        Err(e) => println!("  {} {}", "✗".red().bold(), e),
    }

    let show = |p: Option<PathBuf>| p.map_or_else(|| "-".to_string(), |p| p.display().to_string());
    println!("  {:<15}{}", "Usage log:", show(config.ledger_path()));
    println!("  {:<15}{}", "Overrides:", show(config.overrides_path()));
    println!(
        "  {:<15}{}s per attempt",
        "Timeout:",
        config.attempt_timeout().as_secs()
    );
    println!("  {:<15}{}", "CLI version:", env!("CARGO_PKG_VERSION"));
    Ok(())
}
