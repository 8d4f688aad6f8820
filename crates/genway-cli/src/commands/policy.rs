//! `genway policy`: inspect and edit model selection overrides.

use anyhow::Context;
use clap::{Args, Subcommand};
use colored::Colorize;
use genway_core::policy::{self, ModelPolicy, OverrideDraft, TomlOverrideFile};
use genway_core::{GenwayConfig, Phase, PlanTier, Source};

use super::{print_json, OutputFormat};

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Show which models a call would use.
    Resolve(TargetArgs),
    /// List the named presets for a tier.
    Presets(PresetsArgs),
    /// List stored overrides.
    List,
    /// Store an override for a service, tier and phase.
    Set(SetArgs),
    /// Remove a stored override.
    Clear(ClearArgs),
}

#[derive(Args)]
pub struct TargetArgs {
    /// Service name.
    pub service: String,
    /// Plan tier.
    pub tier: PlanTier,
    /// Workflow phase.
    pub phase: Phase,
}

#[derive(Args)]
pub struct PresetsArgs {
    /// Plan tier.
    pub tier: PlanTier,
}

#[derive(Args)]
pub struct SetArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Use a named preset of the tier.
    #[arg(long, conflicts_with_all = ["primary", "backup"])]
    pub preset: Option<String>,
    /// Primary model id.
    #[arg(long, requires = "backup")]
    pub primary: Option<String>,
    /// Backup model id.
    #[arg(long, requires = "primary")]
    pub backup: Option<String>,
}

#[derive(Args)]
pub struct ClearArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Skip confirmation.
    #[arg(long)]
    pub force: bool,
}

pub async fn execute(
    cmd: PolicyCommands,
    config: &GenwayConfig,
    output: OutputFormat,
) -> anyhow::Result<()> {
    match cmd {
        PolicyCommands::Resolve(args) => resolve(args, config, output).await,
        PolicyCommands::Presets(args) => presets(args, output),
        PolicyCommands::List => list(config, output).await,
        PolicyCommands::Set(args) => set(args, config).await,
        PolicyCommands::Clear(args) => clear(args, config).await,
    }
}

fn override_file(config: &GenwayConfig) -> anyhow::Result<TomlOverrideFile> {
    let path = config
        .overrides_path()
        .context("no overrides_path configured and no home directory found")?;
    Ok(TomlOverrideFile::new(path))
}

async fn resolve(args: TargetArgs, config: &GenwayConfig, output: OutputFormat) -> anyhow::Result<()> {
    let policy = match config.overrides_path() {
        Some(path) => ModelPolicy::new(std::sync::Arc::new(TomlOverrideFile::new(path))),
        None => ModelPolicy::defaults_only(),
    };
    let selection = policy.resolve(&args.service, args.tier, args.phase).await;

    if output == OutputFormat::Json {
        return print_json(&selection);
    }

    let origin = |s: Source| match s {
        Source::Override => "override".cyan().to_string(),
        Source::Default => "default".dimmed().to_string(),
    };
    println!(
        "\n  {} / {} / {}\n",
        args.service.bold(),
        args.tier,
        args.phase
    );
    println!(
        "  {:<10}{} ({})",
        "Primary:".bold(),
        selection.primary,
        origin(selection.primary_source)
    );
    println!(
        "  {:<10}{} ({})",
        "Backup:".bold(),
        selection.backup,
        origin(selection.backup_source)
    );
    Ok(())
}

fn presets(args: PresetsArgs, output: OutputFormat) -> anyhow::Result<()> {
    let presets = policy::presets(args.tier);
    if output == OutputFormat::Json {
        return print_json(&presets);
    }

    println!("\n  Presets for {}:\n", args.tier.to_string().bold());
    for p in presets {
        println!("  {} {}", "•".cyan(), p.name.bold());
        println!("    {}", p.description.dimmed());
        println!("    {} → {}", p.primary, p.backup);
    }
    Ok(())
}

async fn list(config: &GenwayConfig, output: OutputFormat) -> anyhow::Result<()> {
    let file = override_file(config)?;
    let entries = file.entries().await?;

    if output == OutputFormat::Json {
        return print_json(&entries);
    }

    println!("\n  Overrides in {}:\n", file.path().display());
    if entries.is_empty() {
        println!("  (none, every call uses the built-in defaults)");
        return Ok(());
    }
    println!(
        "  {:<20} {:<11} {:<8} {:<28} {}",
        "SERVICE".bold(),
        "TIER".bold(),
        "PHASE".bold(),
        "PRIMARY".bold(),
        "BACKUP".bold()
    );
    println!("  {}", "─".repeat(96).dimmed());
    for e in &entries {
        println!(
            "  {:<20} {:<11} {:<8} {:<28} {}",
            e.service,
            e.tier,
            e.phase,
            e.models.primary.as_deref().unwrap_or("-"),
            e.models.backup.as_deref().unwrap_or("-")
        );
    }
    println!("\n  {} {} override(s)", "→".dimmed(), entries.len());
    Ok(())
}

async fn set(args: SetArgs, config: &GenwayConfig) -> anyhow::Result<()> {
    let TargetArgs {
        service,
        tier,
        phase,
    } = args.target;

    let draft = match (args.preset, args.primary, args.backup) {
        (Some(name), _, _) => OverrideDraft::from_preset(service, tier, phase, &name)?,
        (None, Some(primary), Some(backup)) => {
            OverrideDraft::new(service, tier, phase, primary, backup)
        }
        _ => anyhow::bail!("pass --preset, or both --primary and --backup"),
    };

    let entry = match draft.validate() {
        Ok(entry) => entry,
        Err(e) => {
            eprintln!(
                "  {} See {} for valid ids",
                "→".dimmed(),
                "genway models".green()
            );
            return Err(e.into());
        }
    };

    let file = override_file(config)?;
    let summary = format!(
        "{} / {} / {}",
        entry.service, entry.tier, entry.phase
    );
    let models = entry.models.clone();
    file.upsert(entry).await?;

    println!("  {} Override stored for {}", "✓".green().bold(), summary.bold());
    println!(
        "  {} {} → {}",
        "→".dimmed(),
        models.primary.as_deref().unwrap_or("-").cyan(),
        models.backup.as_deref().unwrap_or("-").cyan()
    );
    Ok(())
}

async fn clear(args: ClearArgs, config: &GenwayConfig) -> anyhow::Result<()> {
    let TargetArgs {
        service,
        tier,
        phase,
    } = args.target;

    if !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!("  Remove override for {service} / {tier} / {phase}?"))
            .default(false)
            .interact()?;
        if !confirm {
            println!("  {} Cancelled.", "→".dimmed());
            return Ok(());
        }
    }

    let file = override_file(config)?;
    if file.remove(&service, tier, phase).await? {
        println!("  {} Override removed; defaults apply again.", "✓".green().bold());
    } else {
        println!("  {} No override stored for that combination.", "→".dimmed());
    }
    Ok(())
}
