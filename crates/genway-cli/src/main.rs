//! genway CLI: tier-aware AI generation from the terminal.
//!
//! `genway` runs generations through the gateway and edits the model
//! overrides it reads.

mod commands;

use clap::Parser;
use commands::{execute, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    execute(cli).await
}
