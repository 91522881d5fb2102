//! # Competitor Intel
//!
//! A concurrent SEO competitive-intelligence engine. One run fans a set of
//! heterogeneous probes (headless-browser extractors, HTTP fetchers, an
//! external audit CLI and modeled estimators) out over a list of competitor
//! domains and merges the independently failing results into one report.
//!
//! ## Probe Categories
//!
//! | Category | Report key | Probe kind | Keyed by target |
//! |----------|------------|------------|-----------------|
//! | Technical SEO | `technicalSEO` | Browser session | ✓ |
//! | Content | `contentAnalysis` | HTTP GET | ✓ |
//! | Competitor | `competitorGaps` | Estimator | ✓ |
//! | Schema | `schemaMarkup` | Browser session | ✓ |
//! | Mobile | `mobileOptimization` | Browser session (375×667) | ✓ |
//! | Security | `securityAnalysis` | HTTP HEAD | ✓ |
//! | Performance | `performanceMetrics` | Lighthouse CLI | |
//! | Keywords | `keywordOpportunities` | Estimator | |
//! | Core Web Vitals | `coreWebVitals` | Browser session | |
//! | Link profile | `linkProfile` | Estimator | |
//!
//! ## Guarantees
//!
//! - Every per-target section holds exactly one entry per target, whatever
//!   order the probes finish in.
//! - A probe never aborts its category: errors, timeouts and panics become
//!   `{"error": "..."}` entries.
//! - Browser sessions are closed on every exit path.
//! - All categories share one semaphore-bounded pool, so a run never has
//!   more than `max_concurrent_probes` sessions, requests or audit processes
//!   in flight.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use competitor_intel::{AnalysisConfig, AnalysisOrchestrator, ProbeSet};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig {
//!         targets: vec!["casino.org".into(), "casino.guru".into()],
//!         ..Default::default()
//!     };
//!     let probes = ProbeSet::standard(&config)?;
//!     let report = AnalysisOrchestrator::new(config, probes).execute().await?;
//!
//!     println!("{} streams graded", report.data_quality.streams.len());
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Analyze the default competitor list
//! competitor-intel
//!
//! # Narrow the run and write artifacts elsewhere
//! competitor-intel --max-concurrent 4 run --targets casino.org,casino.guru --output /tmp/intel
//! ```

/// Configuration and settings for an analysis run
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// Probe contract, targets and per-probe results
pub mod probe;

/// Bounded worker pool shared by every probe category
pub mod worker;

/// Scoped headless browser sessions
pub mod browser;

/// Technical SEO page extraction
pub mod technical_seo;

/// JSON-LD structured data extraction
pub mod schema;

/// Mobile viewport rendering checks
pub mod mobile;

/// Core Web Vitals observation
pub mod web_vitals;

/// Content analysis over raw HTML
pub mod content;

/// Security header scoring
pub mod security;

/// External performance audits
pub mod performance;

/// Modeled competitor, keyword and link estimates
pub mod estimator;

/// Run coordination
pub mod orchestrator;

/// Report assembly and persistence
pub mod report;

/// Command-line interface implementation
pub mod cli;

/// Probe metrics collection
pub mod metrics;

/// Data quality assessment of a finished run
pub mod health;

/// Utility functions and helpers
pub mod utils;


pub use cli::*;
pub use config::*;
pub use error::*;
pub use health::*;
pub use self::metrics::*;
pub use orchestrator::*;
pub use probe::*;
pub use report::*;
pub use utils::*;
pub use worker::*;
