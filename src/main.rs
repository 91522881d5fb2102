use clap::Parser;
use competitor_intel::{setup_logging, AnalysisConfig, Cli, CliRunner};
use std::path::Path;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    setup_logging(args.verbose)?;

    info!("competitor-intel v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;
    let runner = CliRunner::new(config);

    // A dropped run aborts its probe tasks. Return instead of exiting so the
    // runtime drops them and their browser and audit processes are killed.
    let outcome = tokio::select! {
        outcome = runner.run(args.command) => outcome,
        signal = shutdown_signal() => {
            warn!("{} received, abandoning run", signal);
            Err("analysis interrupted".into())
        }
    };

    match outcome {
        Ok(()) => {
            info!("Analysis finished");
            Ok(())
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            Err(e)
        }
    }
}

async fn load_config(args: &Cli) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let mut config = match args.config.as_deref() {
        Some(path) => read_config_file(path).await?,
        None => AnalysisConfig::default(),
    };

    if let Some(max_concurrent) = args.max_concurrent {
        config.max_concurrent_probes = max_concurrent;
    }
    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }

    config.validate()?;

    info!(
        targets = config.targets.len(),
        max_concurrent = config.max_concurrent_probes,
        navigation_timeout = ?config.navigation_timeout,
        "Configuration ready"
    );
    Ok(config)
}

async fn read_config_file(path: &Path) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let config = serde_json::from_str(&raw)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolves with the name of the first termination signal received. Never
/// resolves if the handlers cannot be installed.
async fn shutdown_signal() -> &'static str {
    let handlers = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    );
    let (mut sigint, mut sigterm) = match handlers {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to install signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}
