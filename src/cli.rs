use crate::{AnalysisConfig, AnalysisOrchestrator, MasterReport, OutputPaths, ProbeSet, Target};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

#[derive(Parser)]
#[command(name = "competitor-intel")]
#[command(about = "Concurrent SEO competitive intelligence analysis")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Defaults to `run` with the configured targets
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Maximum concurrent probes across all categories")]
    pub max_concurrent: Option<usize>,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze every target and write the reports
    Run {
        #[arg(long, value_delimiter = ',', help = "Comma-separated competitor domains")]
        targets: Vec<String>,

        #[arg(short, long, help = "Base directory for report artifacts")]
        output: Option<PathBuf>,

        #[arg(long, help = "Seed for modeled competitor estimates")]
        seed: Option<u64>,
    },

    /// Validate configuration
    Validate {
        #[arg(short, long, help = "Configuration file to validate")]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub targets: Vec<String>,
    pub output: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl RunOptions {
    /// Overlay the run flags on a loaded configuration.
    pub fn apply(&self, mut config: AnalysisConfig) -> AnalysisConfig {
        if !self.targets.is_empty() {
            config.targets = self
                .targets
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(Target::from)
                .collect();
        }
        if let Some(output) = &self.output {
            config.output = OutputPaths::under(output);
        }
        if let Some(seed) = self.seed {
            config.estimator_seed = seed;
        }
        config
    }
}

pub struct CliRunner {
    pub config: AnalysisConfig,
}

impl CliRunner {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, command: Option<Commands>) -> Result<(), Box<dyn std::error::Error>> {
        match command {
            None => self.run_analysis(RunOptions::default()).await,
            Some(Commands::Run {
                targets,
                output,
                seed,
            }) => {
                self.run_analysis(RunOptions {
                    targets,
                    output,
                    seed,
                })
                .await
            }
            Some(Commands::Validate { config }) => self.validate_config(config).await,
        }
    }

    pub async fn run_analysis(&self, options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
        let config = options.apply(self.config.clone());
        info!(
            "Starting competitive analysis of {} targets",
            config.targets.len()
        );

        let probes = ProbeSet::standard(&config)?;
        let orchestrator = AnalysisOrchestrator::new(config, probes);
        let report = orchestrator.execute().await?;

        print_summary(&report);
        Ok(())
    }

    pub async fn validate_config(
        &self,
        config_path: PathBuf,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Validating configuration: {}", config_path.display());

        let config_content = fs::read_to_string(&config_path).await?;
        let config: AnalysisConfig = serde_json::from_str(&config_content)?;
        config.validate()?;

        println!("Configuration is valid:");
        println!("  Targets: {}", config.targets.len());
        println!("  Max concurrent probes: {}", config.max_concurrent_probes);
        println!("  Navigation timeout: {:?}", config.navigation_timeout);
        println!("  Audit timeout: {:?}", config.audit_timeout);
        println!("  Performance URLs: {}", config.performance_urls.join(", "));
        println!("  Output: {}", config.output.root.display());

        Ok(())
    }
}

fn print_summary(report: &MasterReport) {
    println!("Analysis complete:");
    println!("  Run: {}", report.run_id);
    println!("  Targets: {}", report.targets.len());
    println!("  Duration: {}ms", report.duration_ms);
    println!("  Completeness: {}%", report.data_quality.completeness);
    println!("  Accuracy: {}%", report.data_quality.accuracy);
    println!("  Report: {}", report.files.master_report);
    println!("  Summary: {}", report.files.markdown_report);
}

pub fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    Ok(())
}
