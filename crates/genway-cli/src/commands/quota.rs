//! `genway quota`: show a user's quota usage.

use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use genway_core::{
    GenwayConfig, JsonlUsageStore, Limit, MemoryUsageStore, PlanTier, QuotaEnforcer, SystemClock,
    UsageStore, WindowUsage,
};

use super::{print_json, OutputFormat};

#[derive(Args)]
pub struct QuotaArgs {
    /// User id.
    #[arg(long, short, default_value = "cli", env = "GENWAY_USER")]
    pub user: String,
    /// Plan tier of the user.
    #[arg(long, short, default_value = "standard")]
    pub tier: PlanTier,
}

pub async fn execute(
    args: QuotaArgs,
    config: &GenwayConfig,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let store: Arc<dyn UsageStore> = match config.ledger_path() {
        Some(path) => Arc::new(JsonlUsageStore::new(path)),
        None => Arc::new(MemoryUsageStore::new()),
    };
    let quota = QuotaEnforcer::new(store, Arc::new(SystemClock));
    let snapshot = quota.snapshot(&args.user, args.tier).await?;

    if output == OutputFormat::Json {
        return print_json(&snapshot);
    }

    println!(
        "\n  Quota for {} on the {} plan:\n",
        args.user.bold(),
        args.tier.to_string().cyan()
    );
    print_window("Today", &snapshot.daily);
    print_window("This month", &snapshot.monthly);
    Ok(())
}

fn print_window(label: &str, window: &WindowUsage) {
    let limit = match window.limit {
        Limit::Capped(max) => max.to_string(),
        Limit::Unlimited => "unlimited".to_string(),
    };
    let used = if window.exhausted() {
        window.used.to_string().red().bold().to_string()
    } else {
        window.used.to_string()
    };
    println!(
        "  {:<12}{} / {}   {} resets {}",
        format!("{label}:"),
        used,
        limit,
        "→".dimmed(),
        window.resets_at.format("%Y-%m-%d %H:%M UTC").to_string().dimmed()
    );
}
