//! `genway models`: list the model catalog.

use clap::Args;
use colored::Colorize;
use genway_core::catalog::{ModelStatus, CATALOG};
use genway_core::BackendKind;

use super::{print_json, OutputFormat};

#[derive(Args)]
pub struct ModelsArgs {
    /// Only models served by this backend: openai, gemini, anthropic.
    #[arg(long, short)]
    pub backend: Option<BackendKind>,
}

pub fn execute(args: ModelsArgs, output: OutputFormat) -> anyhow::Result<()> {
    let models: Vec<_> = CATALOG
        .iter()
        .filter(|m| args.backend.map_or(true, |b| m.backend == b))
        .collect();

    if output == OutputFormat::Json {
        return print_json(&models);
    }

    println!("\n  Model catalog:\n");
    println!(
        "  {:<28} {:<10} {:<10} {:>10} {:>10}  {}",
        "ID".bold(),
        "BACKEND".bold(),
        "TIER".bold(),
        "IN $/M".bold(),
        "OUT $/M".bold(),
        "STATUS".bold()
    );
    println!("  {}", "─".repeat(84).dimmed());
    for m in &models {
        let status = match m.status {
            ModelStatus::Recommended => "recommended".green().to_string(),
            ModelStatus::Available => "available".to_string(),
            ModelStatus::Preview => "preview".yellow().to_string(),
        };
        println!(
            "  {:<28} {:<10} {:<10} {:>10.2} {:>10.2}  {}",
            m.id,
            m.backend,
            format!("{:?}", m.performance).to_lowercase(),
            m.input_cost_per_mtok,
            m.output_cost_per_mtok,
            status
        );
    }
    println!("\n  {} {} model(s)", "→".dimmed(), models.len());
    Ok(())
}
