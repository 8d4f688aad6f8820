//! `genway generate`: run one generation through the gateway.

use std::io::Read;
use std::time::Duration;

use clap::Args;
use colored::Colorize;
use genway_core::{
    Gateway, GenerateOptions, GenerationContext, GenerationRequest, GenwayConfig, Phase,
    PlanTier,
};

use super::{print_json, OutputFormat};

#[derive(Args)]
pub struct GenerateArgs {
    /// Prompt text, or `-` to read it from stdin.
    pub prompt: String,
    /// Plan tier of the caller: none, lite, standard, pro, business, enterprise.
    #[arg(long, short, default_value = "standard")]
    pub tier: PlanTier,
    /// Workflow phase: outline, writing, review.
    #[arg(long, short, default_value = "writing")]
    pub phase: Phase,
    /// Service the call belongs to (selects overrides).
    #[arg(long, short, default_value = "cli")]
    pub service: String,
    /// User id charged for the call.
    #[arg(long, short, default_value = "cli", env = "GENWAY_USER")]
    pub user: String,
    /// System instruction.
    #[arg(long)]
    pub system: Option<String>,
    /// Sampling temperature.
    #[arg(long)]
    pub temperature: Option<f32>,
    /// Maximum output tokens.
    #[arg(long)]
    pub max_tokens: Option<u32>,
    /// Ask for a JSON document.
    #[arg(long)]
    pub json: bool,
    /// Overall timeout in seconds, fallback included.
    #[arg(long)]
    pub timeout: Option<u64>,
}

pub async fn execute(
    args: GenerateArgs,
    config: &GenwayConfig,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let prompt = if args.prompt == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        args.prompt
    };

    let mut builder = GenerationRequest::builder();
    if let Some(system) = args.system {
        builder = builder.system(system);
    }
    builder = builder.user(prompt);
    if let Some(t) = args.temperature {
        builder = builder.temperature(t);
    }
    if let Some(max) = args.max_tokens {
        builder = builder.max_output_tokens(max);
    }
    if args.json {
        builder = builder.json();
    }
    let request = builder.build();

    let gateway = Gateway::from_config(config)?;
    let ctx = GenerationContext::new(&args.user, &args.service, args.tier, args.phase);
    let options = GenerateOptions {
        timeout: args.timeout.map(Duration::from_secs),
    };

    let spinner = indicatif::ProgressBar::new_spinner();
    if output == OutputFormat::Text {
        spinner.set_message(format!("Generating ({} / {})", args.tier, args.phase));
        spinner.enable_steady_tick(Duration::from_millis(100));
    }
    let result = gateway.generate_with(&ctx, &request, options).await;
    spinner.finish_and_clear();
    gateway.flush().await;

    match result {
        Ok(resp) => match output {
            OutputFormat::Json => print_json(&resp)?,
            OutputFormat::Text => {
                println!("{}", resp.content);
                println!();
                let note = if resp.fell_back {
                    " (backup)".yellow().to_string()
                } else {
                    String::new()
                };
                println!("  {} {} via {}{}", "→".dimmed(), resp.model.cyan(), resp.backend, note);
                if let Some(usage) = resp.usage {
                    println!(
                        "  {} {} tokens in, {} out",
                        "→".dimmed(),
                        usage.input_tokens,
                        usage.output_tokens
                    );
                }
            }
        },
        Err(e) => {
            eprintln!("  {} {}", "✗".red().bold(), e.user_message());
            eprintln!("  {} {}", "→".dimmed(), e.to_string().dimmed());
            std::process::exit(1);
        }
    }
    Ok(())
}
