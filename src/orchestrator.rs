//! Run coordinator fanning every probe category out over the target list
//!
//! This module provides the [`AnalysisOrchestrator`] that runs all per-target
//! categories concurrently on one bounded [`WorkerPool`], then the global
//! probes, and hands the merged results to the report generator.

use crate::browser::{BrowserLauncher, BrowserProbe, ChromiumLauncher, SessionOptions};
use crate::content::{ContentProbe, ContentReport};
use crate::estimator::{
    CompetitorProbe, CompetitorProfile, Estimator, KeywordOpportunities, LinkProfile,
    ModeledEstimator,
};
use crate::mobile::{MobileExtractor, MobileReport};
use crate::performance::{AuditCommand, LighthouseCommand, PerformanceRunner, PerformanceSummary};
use crate::report::{AggregateReport, MasterReport, ReportGenerator, ReportWriter, RunMetadata};
use crate::schema::{SchemaExtractor, SchemaReport};
use crate::security::{SecurityProbe, SecurityReport};
use crate::technical_seo::{TechnicalSeoExtractor, TechnicalSeoReport};
use crate::web_vitals::{WebVitalsExtractor, WebVitalsReport};
use crate::{
    format_duration, AnalysisConfig, AnalysisError, Category, Probe, ProbeError, ProbeMetrics,
    ProbeResult, Target, Viewport, WorkerPool,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tasks one run submits besides the per-target probes.
const GLOBAL_PROBES: usize = 4;

/// The analyzers used by one run
///
/// Every category is a trait object so tests and alternative data sources
/// can replace any of them without touching the orchestrator.
#[derive(Clone)]
pub struct ProbeSet {
    pub technical_seo: Arc<dyn Probe<Output = TechnicalSeoReport>>,
    pub content: Arc<dyn Probe<Output = ContentReport>>,
    pub competitor: Arc<dyn Probe<Output = CompetitorProfile>>,
    pub schema: Arc<dyn Probe<Output = SchemaReport>>,
    pub mobile: Arc<dyn Probe<Output = MobileReport>>,
    pub security: Arc<dyn Probe<Output = SecurityReport>>,
    pub web_vitals: Arc<dyn Probe<Output = WebVitalsReport>>,
    pub estimator: Arc<dyn Estimator>,
    pub performance: Arc<PerformanceRunner>,
}

impl ProbeSet {
    /// Wire every analyzer to the given browser, estimator and audit backends.
    pub fn from_config(
        config: &AnalysisConfig,
        launcher: Arc<dyn BrowserLauncher>,
        estimator: Arc<dyn Estimator>,
        audit: Arc<dyn AuditCommand>,
    ) -> Result<Self, ProbeError> {
        let desktop = SessionOptions::from_config(config, Viewport::default());
        let mobile = SessionOptions::from_config(config, config.mobile_viewport.clone());

        Ok(Self {
            technical_seo: Arc::new(BrowserProbe::new(
                launcher.clone(),
                TechnicalSeoExtractor,
                desktop.clone(),
            )),
            content: Arc::new(ContentProbe::new(config, estimator.clone())?),
            competitor: Arc::new(CompetitorProbe::new(estimator.clone())),
            schema: Arc::new(BrowserProbe::new(
                launcher.clone(),
                SchemaExtractor,
                desktop.clone(),
            )),
            mobile: Arc::new(BrowserProbe::new(launcher.clone(), MobileExtractor, mobile)),
            security: Arc::new(SecurityProbe::new(config)?),
            web_vitals: Arc::new(BrowserProbe::new(
                launcher,
                WebVitalsExtractor::new(config.vitals_window),
                desktop,
            )),
            estimator,
            performance: Arc::new(PerformanceRunner::new(audit, config)),
        })
    }

    /// Headless Chromium, the modeled estimator and the Lighthouse CLI.
    pub fn standard(config: &AnalysisConfig) -> Result<Self, ProbeError> {
        Self::from_config(
            config,
            Arc::new(ChromiumLauncher::new(config.clone())),
            Arc::new(ModeledEstimator::new(config.estimator_seed)),
            Arc::new(LighthouseCommand::from_config(config)),
        )
    }
}

/// Coordinates one analysis run
///
/// # Examples
///
/// ```rust,no_run
/// use competitor_intel::{AnalysisConfig, AnalysisOrchestrator, ProbeSet};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = AnalysisConfig::default();
///     let probes = ProbeSet::standard(&config)?;
///     let orchestrator = AnalysisOrchestrator::new(config, probes);
///
///     let report = orchestrator.execute().await?;
///     println!("Completeness: {}%", report.data_quality.completeness);
///     Ok(())
/// }
/// ```
pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    probes: ProbeSet,
    metrics: Arc<ProbeMetrics>,
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig, probes: ProbeSet) -> Self {
        Self {
            config,
            probes,
            metrics: Arc::new(ProbeMetrics::new()),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ProbeMetrics {
        &self.metrics
    }

    /// Run every probe and merge the results.
    ///
    /// Each per-target section holds exactly one entry per distinct target.
    /// Probe failures are recorded in place and never abort the run.
    pub async fn run(&self, targets: &[Target]) -> AggregateReport {
        let pool = WorkerPool::new(
            self.config.max_concurrent_probes,
            self.metrics.clone(),
            targets.len() * Category::PER_TARGET.len() + GLOBAL_PROBES,
        );
        info!(
            "Analyzing {} targets across {} categories ({} concurrent probes)",
            targets.len(),
            Category::PER_TARGET.len(),
            pool.capacity()
        );

        let p = &self.probes;
        let (
            technical_seo,
            content_analysis,
            competitor_gaps,
            schema_markup,
            mobile_optimization,
            security_analysis,
        ) = tokio::join!(
            pool.run_category(Category::TechnicalSeo, p.technical_seo.clone(), targets),
            pool.run_category(Category::Content, p.content.clone(), targets),
            pool.run_category(Category::Competitor, p.competitor.clone(), targets),
            pool.run_category(Category::Schema, p.schema.clone(), targets),
            pool.run_category(Category::Mobile, p.mobile.clone(), targets),
            pool.run_category(Category::Security, p.security.clone(), targets),
        );
        let progress = pool.progress();
        info!(
            "Per-target categories complete: {}/{} probes in {} ({:.1}/s), running global probes",
            progress.completed,
            progress.total,
            format_duration(progress.elapsed),
            progress.rate
        );
        if let Some(eta) = progress.eta {
            debug!("Estimated {} until the global probes finish", format_duration(eta));
        }

        let (performance_metrics, keyword_opportunities, core_web_vitals, link_profile) =
            self.run_globals(&pool, targets).await;

        let progress = pool.progress();
        if !progress.is_complete() {
            warn!(
                "Only {} of {} probe tasks reported back",
                progress.completed, progress.total
            );
        }
        info!(
            "Run finished: {}/{} probes succeeded, peak {} in flight",
            progress.success,
            progress.completed,
            pool.peak_in_flight()
        );

        AggregateReport {
            technical_seo,
            content_analysis,
            competitor_gaps,
            schema_markup,
            mobile_optimization,
            security_analysis,
            performance_metrics,
            keyword_opportunities,
            core_web_vitals,
            link_profile,
        }
    }

    async fn run_globals(
        &self,
        pool: &WorkerPool,
        targets: &[Target],
    ) -> (
        ProbeResult<PerformanceSummary>,
        ProbeResult<KeywordOpportunities>,
        ProbeResult<WebVitalsReport>,
        ProbeResult<LinkProfile>,
    ) {
        let performance = {
            let runner = self.probes.performance.clone();
            let urls = self.config.performance_urls.clone();
            pool.run_single(Category::Performance, "local audits", async move {
                runner.analyze(&urls).await
            })
        };

        let keywords = {
            let estimator = self.probes.estimator.clone();
            pool.run_single(Category::Keywords, "keyword model", async move {
                ProbeResult::from(estimator.keyword_opportunities().await)
            })
        };

        let vitals_target = Target::from(self.config.web_vitals_url.as_str());
        let web_vitals = {
            let probe = self.probes.web_vitals.clone();
            let target = vitals_target.clone();
            pool.run_single(Category::WebVitals, vitals_target.as_str(), async move {
                probe.analyze(&target).await
            })
        };

        let links = {
            let estimator = self.probes.estimator.clone();
            let targets = targets.to_vec();
            pool.run_single(Category::LinkProfile, "link model", async move {
                ProbeResult::from(estimator.link_profile(&targets).await)
            })
        };

        tokio::join!(performance, keywords, web_vitals, links)
    }

    /// Validate the configuration, run every probe and persist both reports.
    ///
    /// Only configuration, directory and write errors fail the run.
    pub async fn execute(&self) -> Result<MasterReport, AnalysisError> {
        self.config
            .validate()
            .map_err(|e| AnalysisError::InvalidConfig(e.to_string()))?;
        self.prepare_output().await?;

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!("Starting analysis run {}", run_id);

        let results = self.run(&self.config.targets).await;

        let metadata = RunMetadata {
            run_id,
            targets: self.config.targets.clone(),
            started_at,
            finished_at: Utc::now(),
            paths: self.config.output.clone(),
        };
        let master = ReportGenerator::generate(results, &metadata);
        let markdown = ReportGenerator::generate_markdown(&master);
        ReportWriter::persist(&master, &markdown, &self.config.output).await?;

        self.metrics.log_summary();
        if master.data_quality.accuracy < 100.0 {
            warn!(
                "Run {} finished with {}% accuracy",
                master.run_id, master.data_quality.accuracy
            );
        }
        Ok(master)
    }

    async fn prepare_output(&self) -> Result<(), AnalysisError> {
        for dir in self.config.output.directories() {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| AnalysisError::OutputDirectory {
                    path: dir.display().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}
