use anyhow::{Context, Result};
use clap::Parser;
use llmstack::{
    cli::{Cli, Commands, StackArgs},
    config::StackConfig,
    engine::{ManifestEngine, RecordingEngine},
    preload::{preload_with_retry, HttpPreloader, RetryPolicy},
    service::{preload_model, DeploymentOrchestrator, DeploymentOutcome},
};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Plan { stack } => {
            let config = load_stack(&stack)?;
            let platform = config.platform.platform();
            let engine = RecordingEngine::new(config.location());

            let outcome = DeploymentOrchestrator::new(&config, platform.as_ref(), &engine)
                .deploy()
                .await?;
            report(&outcome);

            // Print only the resources to stdout
            println!("{}", serde_json::to_string_pretty(&engine.applied())?);

            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Apply {
            stack,
            out,
            no_preload,
        } => {
            let config = load_stack(&stack)?;
            let platform = config.platform.platform();
            let engine = ManifestEngine::new(&out, platform.as_ref(), config.location())?;

            info!(
                "Deploying {} service(s) to {}",
                config.services.len(),
                config.platform
            );
            let outcome = DeploymentOrchestrator::new(&config, platform.as_ref(), &engine)
                .deploy()
                .await?;
            report(&outcome);

            if !no_preload {
                let preloader = HttpPreloader::new();
                preload_model(&config, &outcome, &preloader, &RetryPolicy::default()).await;
            }

            println!(
                "{}",
                serde_json::to_string_pretty(&outcome.exports(&config.model.name))?
            );

            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Preload {
            url,
            model,
            attempts,
            delay_secs,
        } => {
            let policy = RetryPolicy {
                initial_delay: Duration::ZERO,
                attempts,
                delay: Duration::from_secs(delay_secs),
            };
            let preloader = HttpPreloader::new();
            let outcome = preload_with_retry(&preloader, &url, &model, &policy).await;
            if !outcome.is_loaded() {
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("llmstack {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn load_stack(args: &StackArgs) -> Result<StackConfig> {
    let mut config =
        StackConfig::load(args.config.as_deref()).context("Failed to load stack config")?;

    if let Some(platform) = args.platform {
        config.platform = platform;
    }
    if let Some(region) = &args.region {
        config.region = region.clone();
    }
    Ok(config)
}

fn report(outcome: &DeploymentOutcome) {
    for (service, address) in &outcome.addresses {
        info!("{} -> {}", service, address);
    }
    for failure in &outcome.failed {
        error!("{} failed: {}", failure.service, failure.error);
    }
    for service in &outcome.skipped {
        warn!("{} skipped: a dependency failed", service);
    }
}
