//! Aggregate report assembly and persistence
//!
//! [`ReportGenerator`] turns the results of one run into the master report
//! and its Markdown summary without touching the filesystem;
//! [`ReportWriter`] flushes both once the run is over.

use crate::content::ContentReport;
use crate::error::AnalysisError;
use crate::estimator::{CompetitorProfile, KeywordOpportunities, LinkProfile};
use crate::health::{self, DataQuality, StreamStatus};
use crate::mobile::MobileReport;
use crate::performance::{AuditStatus, PerformanceSummary};
use crate::schema::SchemaReport;
use crate::security::SecurityReport;
use crate::technical_seo::TechnicalSeoReport;
use crate::web_vitals::WebVitalsReport;
use crate::{Category, CategoryResultMap, OutputPaths, ProbeResult, Target};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub const REPORT_TITLE: &str = "Competitive Intelligence Analysis";

/// Everything one run produced, keyed the way the master report exposes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    #[serde(rename = "technicalSEO")]
    pub technical_seo: CategoryResultMap<TechnicalSeoReport>,
    pub content_analysis: CategoryResultMap<ContentReport>,
    pub competitor_gaps: CategoryResultMap<CompetitorProfile>,
    pub schema_markup: CategoryResultMap<SchemaReport>,
    pub mobile_optimization: CategoryResultMap<MobileReport>,
    pub security_analysis: CategoryResultMap<SecurityReport>,
    pub performance_metrics: ProbeResult<PerformanceSummary>,
    pub keyword_opportunities: ProbeResult<KeywordOpportunities>,
    pub core_web_vitals: ProbeResult<WebVitalsReport>,
    pub link_profile: ProbeResult<LinkProfile>,
}

/// Probe outcomes of one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl CategoryOutcome {
    pub fn of_map<T>(map: &CategoryResultMap<T>) -> Self {
        let succeeded = map.values().filter(|r| r.is_success()).count();
        Self {
            succeeded,
            failed: map.len() - succeeded,
        }
    }

    pub fn of_result<T>(result: &ProbeResult<T>) -> Self {
        if result.is_success() {
            Self {
                succeeded: 1,
                failed: 0,
            }
        } else {
            Self {
                succeeded: 0,
                failed: 1,
            }
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

impl AggregateReport {
    /// Outcome of every stream, per-target categories first.
    ///
    /// The performance stream counts individual URL audits, so one failed
    /// audit out of two makes it partial.
    pub fn outcomes(&self) -> Vec<(Category, CategoryOutcome)> {
        let performance = match &self.performance_metrics {
            ProbeResult::Success(summary) if !summary.audits.is_empty() => CategoryOutcome {
                succeeded: summary.completed(),
                failed: summary.audits.len() - summary.completed(),
            },
            other => CategoryOutcome::of_result(other),
        };

        vec![
            (Category::TechnicalSeo, CategoryOutcome::of_map(&self.technical_seo)),
            (Category::Content, CategoryOutcome::of_map(&self.content_analysis)),
            (Category::Competitor, CategoryOutcome::of_map(&self.competitor_gaps)),
            (Category::Schema, CategoryOutcome::of_map(&self.schema_markup)),
            (Category::Mobile, CategoryOutcome::of_map(&self.mobile_optimization)),
            (Category::Security, CategoryOutcome::of_map(&self.security_analysis)),
            (Category::Performance, performance),
            (Category::Keywords, CategoryOutcome::of_result(&self.keyword_opportunities)),
            (Category::WebVitals, CategoryOutcome::of_result(&self.core_web_vitals)),
            (Category::LinkProfile, CategoryOutcome::of_result(&self.link_profile)),
        ]
    }
}

/// Facts about the run that are not probe results.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub run_id: String,
    pub targets: Vec<Target>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub paths: OutputPaths,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCompetitor {
    pub target: Target,
    pub overall_score: u32,
    pub tier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub targets_analyzed: usize,
    pub categories: BTreeMap<String, CategoryOutcome>,
    pub average_security_score: Option<f64>,
    pub tier_distribution: BTreeMap<String, usize>,
    pub strongest_competitors: Vec<RankedCompetitor>,
    pub audits_completed: usize,
    pub audits_total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFiles {
    pub master_report: String,
    pub markdown_report: String,
    pub lighthouse_config: String,
    pub budget: String,
    pub lighthouse_dir: String,
}

impl From<&OutputPaths> for ReportFiles {
    fn from(paths: &OutputPaths) -> Self {
        Self {
            master_report: paths.master_report.display().to_string(),
            markdown_report: paths.markdown_report.display().to_string(),
            lighthouse_config: paths.lighthouse_config.display().to_string(),
            budget: paths.budget.display().to_string(),
            lighthouse_dir: paths.lighthouse_dir.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterReport {
    pub title: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub targets: Vec<Target>,
    pub executive_summary: ExecutiveSummary,
    pub data_quality: DataQuality,
    pub results: AggregateReport,
    pub files: ReportFiles,
}

/// How many competitors the summary ranks.
const STRONGEST_COMPETITORS: usize = 3;

pub struct ReportGenerator;

impl ReportGenerator {
    pub fn generate(results: AggregateReport, metadata: &RunMetadata) -> MasterReport {
        let outcomes = results.outcomes();
        let data_quality = health::assess(&outcomes);
        let executive_summary = Self::summarize(&results, &outcomes, metadata.targets.len());
        let duration_ms = (metadata.finished_at - metadata.started_at)
            .num_milliseconds()
            .max(0) as u64;

        MasterReport {
            title: REPORT_TITLE.to_string(),
            run_id: metadata.run_id.clone(),
            generated_at: metadata.finished_at,
            started_at: metadata.started_at,
            duration_ms,
            targets: metadata.targets.clone(),
            executive_summary,
            data_quality,
            results,
            files: ReportFiles::from(&metadata.paths),
        }
    }

    fn summarize(
        results: &AggregateReport,
        outcomes: &[(Category, CategoryOutcome)],
        targets_analyzed: usize,
    ) -> ExecutiveSummary {
        let scores: Vec<f64> = results
            .security_analysis
            .values()
            .filter_map(|r| r.success())
            .map(|s| s.security_score as f64)
            .collect();
        let average_security_score = if scores.is_empty() {
            None
        } else {
            Some(crate::utils::round2(
                scores.iter().sum::<f64>() / scores.len() as f64,
            ))
        };

        let mut tier_distribution = BTreeMap::new();
        let mut ranked: Vec<RankedCompetitor> = Vec::new();
        for (target, result) in &results.competitor_gaps {
            if let Some(profile) = result.success() {
                let position = &profile.competitive_position;
                *tier_distribution
                    .entry(position.tier.as_str().to_string())
                    .or_insert(0) += 1;
                ranked.push(RankedCompetitor {
                    target: target.clone(),
                    overall_score: position.overall_score,
                    tier: position.tier.as_str().to_string(),
                });
            }
        }
        // Stable sort keeps target order among equal scores.
        ranked.sort_by(|a, b| b.overall_score.cmp(&a.overall_score));
        ranked.truncate(STRONGEST_COMPETITORS);

        let (audits_completed, audits_total) = match &results.performance_metrics {
            ProbeResult::Success(summary) => (summary.completed(), summary.audits.len()),
            ProbeResult::Failure { .. } => (0, 0),
        };

        ExecutiveSummary {
            targets_analyzed,
            categories: outcomes
                .iter()
                .map(|(category, outcome)| (category.as_str().to_string(), *outcome))
                .collect(),
            average_security_score,
            tier_distribution,
            strongest_competitors: ranked,
            audits_completed,
            audits_total,
        }
    }

    /// Human-readable summary of a master report.
    pub fn generate_markdown(report: &MasterReport) -> String {
        let summary = &report.executive_summary;
        let quality = &report.data_quality;
        let mut lines = vec![
            format!("# {}", report.title),
            String::new(),
            format!("- **Run**: `{}`", report.run_id),
            format!("- **Generated**: {}", report.generated_at.to_rfc3339()),
            format!(
                "- **Duration**: {}",
                crate::utils::format_duration(std::time::Duration::from_millis(report.duration_ms))
            ),
            format!("- **Competitors analyzed**: {}", summary.targets_analyzed),
            String::new(),
            "## Data Quality".to_string(),
            String::new(),
            format!("- **Completeness**: {}%", quality.completeness),
            format!("- **Accuracy**: {}%", quality.accuracy),
            format!("- **Overall**: {:?}", quality.overall),
            String::new(),
            "| Stream | Status | Succeeded | Failed |".to_string(),
            "|--------|--------|-----------|--------|".to_string(),
        ];

        for stream in &quality.streams {
            let status = match stream.status {
                StreamStatus::Success => "✅ Success",
                StreamStatus::Partial => "⚠️ Partial",
                StreamStatus::Error => "❌ Error",
            };
            lines.push(format!(
                "| {} | {} | {} | {} |",
                stream.stream, status, stream.data_points, stream.failures
            ));
        }

        lines.extend([String::new(), "## Competitive Landscape".to_string(), String::new()]);
        if summary.strongest_competitors.is_empty() {
            lines.push("No competitor profiles were produced.".to_string());
        } else {
            lines.push("| Competitor | Score | Tier |".to_string());
            lines.push("|------------|-------|------|".to_string());
            for competitor in &summary.strongest_competitors {
                lines.push(format!(
                    "| {} | {} | {} |",
                    competitor.target, competitor.overall_score, competitor.tier
                ));
            }
            lines.push(String::new());
            for (tier, count) in &summary.tier_distribution {
                lines.push(format!("- **{}**: {} competitors", tier, count));
            }
        }

        lines.extend([String::new(), "## Security".to_string(), String::new()]);
        lines.push(match summary.average_security_score {
            Some(score) => format!("- **Average security score**: {}/100", score),
            None => "- **Average security score**: unavailable".to_string(),
        });

        lines.extend([String::new(), "## Performance".to_string(), String::new()]);
        match &report.results.performance_metrics {
            ProbeResult::Success(performance) => {
                lines.push(format!(
                    "- **Audits completed**: {}/{}",
                    summary.audits_completed, summary.audits_total
                ));
                for audit in &performance.audits {
                    let outcome = match audit.status {
                        AuditStatus::Complete => "complete".to_string(),
                        AuditStatus::Failed => {
                            format!("failed ({})", audit.error.as_deref().unwrap_or("unknown"))
                        }
                    };
                    lines.push(format!("  - {}: {}", audit.url, outcome));
                }
            }
            ProbeResult::Failure { error } => {
                lines.push(format!("- **Audits**: failed ({})", error));
            }
        }

        match &report.results.core_web_vitals {
            ProbeResult::Success(vitals) => {
                let lcp = vitals
                    .lcp
                    .map(|ms| format!("{:.0}ms", ms))
                    .unwrap_or_else(|| "not observed".to_string());
                lines.push(format!("- **LCP** ({}): {}", vitals.url, lcp));
                lines.push(format!("- **CLS** ({}): {:.3}", vitals.url, vitals.cls));
            }
            ProbeResult::Failure { error } => {
                lines.push(format!("- **Core Web Vitals**: failed ({})", error));
            }
        }

        lines.extend([
            String::new(),
            "## Files".to_string(),
            String::new(),
            format!("- **Master report**: {}", report.files.master_report),
            format!("- **Lighthouse config**: {}", report.files.lighthouse_config),
            format!("- **Performance budget**: {}", report.files.budget),
            format!("- **Lighthouse reports**: {}/", report.files.lighthouse_dir),
            String::new(),
        ]);

        lines.join("\n")
    }
}

/// Writes the finished report artifacts.
pub struct ReportWriter;

impl ReportWriter {
    pub async fn persist(
        report: &MasterReport,
        markdown: &str,
        paths: &OutputPaths,
    ) -> Result<(), AnalysisError> {
        let json = serde_json::to_string_pretty(report)?;
        write_file(&paths.master_report, &json).await?;
        write_file(&paths.markdown_report, markdown).await?;

        info!(
            "Reports written to {} and {}",
            paths.master_report.display(),
            paths.markdown_report.display()
        );
        Ok(())
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<(), AnalysisError> {
    let failed = |source| AnalysisError::WriteFailed {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }
    tokio::fs::write(path, contents).await.map_err(failed)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::estimator::{self, ModeledEstimator};
    use crate::performance::UrlAudit;

    /// A report whose every stream has data, with one failed security probe.
    pub fn sample_report(targets: &[Target]) -> AggregateReport {
        let estimator = ModeledEstimator::new(7);
        let mut security_analysis = CategoryResultMap::new();
        for (i, target) in targets.iter().enumerate() {
            let result = if i == 0 {
                ProbeResult::failure("Network error: request timed out after 30s")
            } else {
                let headers = [("x-frame-options".to_string(), "DENY".to_string())]
                    .into_iter()
                    .collect();
                ProbeResult::Success(SecurityReport::new(true, headers))
            };
            security_analysis.insert(target.clone(), result);
        }

        AggregateReport {
            technical_seo: targets
                .iter()
                .map(|t| (t.clone(), ProbeResult::failure("Navigation timed out after 30s")))
                .collect(),
            content_analysis: targets
                .iter()
                .map(|t| (t.clone(), ProbeResult::failure("Network error: refused")))
                .collect(),
            competitor_gaps: targets
                .iter()
                .map(|t| (t.clone(), ProbeResult::Success(estimator.profile(t))))
                .collect(),
            schema_markup: targets
                .iter()
                .map(|t| (t.clone(), ProbeResult::Success(SchemaReport::from_blocks(&[]))))
                .collect(),
            mobile_optimization: targets
                .iter()
                .map(|t| (t.clone(), ProbeResult::failure("Browser launch failed: no chrome")))
                .collect(),
            security_analysis,
            performance_metrics: ProbeResult::Success(PerformanceSummary {
                summary: "Analysis complete - check ./analysis-results/lighthouse/".to_string(),
                audits: vec![
                    UrlAudit {
                        url: "http://localhost:3000".to_string(),
                        status: AuditStatus::Complete,
                        output_path: "./analysis-results/lighthouse/localhost_3000".to_string(),
                        error: None,
                    },
                    UrlAudit {
                        url: "http://localhost:8080".to_string(),
                        status: AuditStatus::Failed,
                        output_path: "./analysis-results/lighthouse/localhost_8080".to_string(),
                        error: Some("exit status: 1".to_string()),
                    },
                ],
            }),
            keyword_opportunities: ProbeResult::Success(estimator::keyword_opportunities()),
            core_web_vitals: ProbeResult::failure("Navigation timed out after 30s"),
            link_profile: ProbeResult::Success(estimator.link_profile_for(targets)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::sample_report;
    use super::*;
    use crate::health::HealthLevel;

    fn targets() -> Vec<Target> {
        vec!["casino.org".into(), "casino.guru".into(), "casino.ca".into()]
    }

    fn metadata(paths: OutputPaths) -> RunMetadata {
        let started_at = Utc::now();
        RunMetadata {
            run_id: "run-1".to_string(),
            targets: targets(),
            started_at,
            finished_at: started_at + chrono::Duration::milliseconds(1500),
            paths,
        }
    }

    #[test]
    fn test_aggregate_report_round_trips() {
        let report = sample_report(&targets());
        let json = serde_json::to_string(&report).unwrap();
        let parsed: AggregateReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["technicalSEO"]["casino.org"]["error"].is_string());
        assert!(value["securityAnalysis"]["casino.guru"]["securityScore"].is_number());
        assert!(value["linkProfile"]["estimatedBacklinks"].is_object());
    }

    #[test]
    fn test_populated_report_round_trips() {
        use crate::browser::NetworkSummary;
        use crate::content::analyze_html;
        use crate::estimator::ModeledEstimator;
        use crate::mobile::MobileSnapshot;
        use crate::technical_seo::PageSnapshot;
        use crate::web_vitals::VitalsSnapshot;

        let mut report = sample_report(&targets());
        let page_metrics: BTreeMap<String, f64> = [
            ("JSHeapUsedSize".to_string(), 1_843_200.0),
            ("TaskDuration".to_string(), 0.123456789),
        ]
        .into_iter()
        .collect();
        let estimator = ModeledEstimator::new(7);

        for target in targets() {
            let url = format!("https://{target}");
            let snapshot: PageSnapshot = serde_json::from_value(serde_json::json!({
                "host": target.as_str(),
                "title": "Casino Reviews",
                "meta": { "description": "Best online casinos" },
                "headings": { "h1": [{ "text": "Reviews", "id": "top" }] },
                "links": [
                    { "host": target.as_str(), "nofollow": false },
                    { "host": "partner.com", "nofollow": true }
                ],
                "images": [{ "hasAlt": true, "lazy": true, "src": "hero.webp" }],
                "canonical": format!("{url}/"),
                "charset": "UTF-8",
                "doctype": "html",
                "wordCount": 812,
                "structuredData": [
                    r#"{"@type":"Organization","aggregateRating":{"ratingValue":4.7}}"#
                ]
            }))
            .unwrap();
            let network = NetworkSummary {
                requests: 42,
                responses: 40,
                failed_responses: 1,
            };
            report.technical_seo.insert(
                target.clone(),
                ProbeResult::Success(TechnicalSeoReport::from_snapshot(
                    &url,
                    snapshot,
                    network,
                    page_metrics.clone(),
                )),
            );

            report.content_analysis.insert(
                target.clone(),
                ProbeResult::Success(ContentReport {
                    url: url.clone(),
                    status: 200,
                    metrics: analyze_html(
                        target.as_str(),
                        "<h1>Casino 2025</h1><p>Online casino bonus. Slots pay weekly!</p>",
                        2025,
                    ),
                    social_signals: estimator.social(&target),
                }),
            );

            report.mobile_optimization.insert(
                target.clone(),
                ProbeResult::Success(MobileReport::from(MobileSnapshot {
                    has_viewport_meta: true,
                    viewport_content: Some("width=device-width, initial-scale=1".to_string()),
                    touch_targets: 37,
                    text_size: Some(15.5),
                    content_width: 380,
                    viewport_width: 375,
                    has_hamburger_menu: true,
                    has_mobile_specific_elements: false,
                })),
            );
        }
        report.core_web_vitals = ProbeResult::Success(WebVitalsReport::from_snapshot(
            "http://localhost:3000",
            VitalsSnapshot {
                lcp: Some(1834.7),
                cls: 0.0412,
                fcp: Some(912.3),
                ttfb: Some(87.25),
            },
            page_metrics,
        ));

        let json = serde_json::to_string(&report).unwrap();
        let parsed: AggregateReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let content = &value["contentAnalysis"]["casino.org"];
        assert!(content["readabilityScore"].is_number());
        assert_eq!(content["headingCount"]["h1"], 1);
        assert!(content["socialSignals"]["socialScore"].is_number());
        assert_eq!(value["technicalSEO"]["casino.guru"]["network"]["requests"], 42);
        assert_eq!(value["mobileOptimization"]["casino.ca"]["isResponsive"], true);
        assert_eq!(value["coreWebVitals"]["lcpRating"], "good");
        assert!(value["coreWebVitals"]["fid"].is_null());
    }

    #[test]
    fn test_outcomes_cover_every_stream() {
        let outcomes = sample_report(&targets()).outcomes();
        assert_eq!(outcomes.len(), 10);

        let security = outcomes
            .iter()
            .find(|(c, _)| *c == Category::Security)
            .map(|(_, o)| *o)
            .unwrap();
        assert_eq!(security, CategoryOutcome { succeeded: 2, failed: 1 });

        let performance = outcomes
            .iter()
            .find(|(c, _)| *c == Category::Performance)
            .map(|(_, o)| *o)
            .unwrap();
        assert_eq!(performance.total(), 2);
        assert_eq!(performance.succeeded, 1);
    }

    #[test]
    fn test_generate_master_report() {
        let master =
            ReportGenerator::generate(sample_report(&targets()), &metadata(OutputPaths::default()));

        assert_eq!(master.title, REPORT_TITLE);
        assert_eq!(master.duration_ms, 1500);
        assert_eq!(master.executive_summary.targets_analyzed, 3);
        assert_eq!(master.executive_summary.average_security_score, Some(15.0));
        assert_eq!(master.executive_summary.audits_completed, 1);
        assert_eq!(master.executive_summary.audits_total, 2);
        assert_eq!(master.executive_summary.strongest_competitors.len(), 3);
        assert_eq!(
            master.executive_summary.tier_distribution.values().sum::<usize>(),
            3
        );

        let scores: Vec<u32> = master
            .executive_summary
            .strongest_competitors
            .iter()
            .map(|c| c.overall_score)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));

        // competitor, schema, keywords and link profile are complete
        assert_eq!(master.data_quality.completeness, 40.0);
        assert_eq!(master.data_quality.accuracy, 60.0);
        assert_eq!(master.data_quality.overall, HealthLevel::Warning);

        let json = serde_json::to_value(&master).unwrap();
        assert!(json["executiveSummary"]["categories"]["securityAnalysis"].is_object());
        assert!(json["dataQuality"]["streams"].is_array());
        assert!(json["results"]["competitorGaps"]["casino.ca"].is_object());
    }

    #[test]
    fn test_markdown_summary() {
        let master =
            ReportGenerator::generate(sample_report(&targets()), &metadata(OutputPaths::default()));
        let markdown = ReportGenerator::generate_markdown(&master);

        assert!(markdown.starts_with("# Competitive Intelligence Analysis"));
        assert!(markdown.contains("`run-1`"));
        assert!(markdown.contains("**Completeness**: 40%"));
        assert!(markdown.contains("| securityAnalysis | ⚠️ Partial | 2 | 1 |"));
        assert!(markdown.contains("| technicalSEO | ❌ Error | 0 | 3 |"));
        assert!(markdown.contains("**Average security score**: 15/100"));
        assert!(markdown.contains("http://localhost:8080: failed (exit status: 1)"));
        assert!(markdown.contains("**Core Web Vitals**: failed"));
    }

    #[tokio::test]
    async fn test_persist_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths::under(dir.path());
        let master = ReportGenerator::generate(sample_report(&targets()), &metadata(paths.clone()));
        let markdown = ReportGenerator::generate_markdown(&master);

        ReportWriter::persist(&master, &markdown, &paths).await.unwrap();

        let written = tokio::fs::read_to_string(&paths.master_report).await.unwrap();
        let parsed: MasterReport = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, master);
        assert_eq!(
            tokio::fs::read_to_string(&paths.markdown_report).await.unwrap(),
            markdown
        );
    }

    #[tokio::test]
    async fn test_persist_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "file").await.unwrap();

        // A regular file where a directory is expected
        let paths = OutputPaths::under(&blocker);
        let master = ReportGenerator::generate(sample_report(&targets()), &metadata(paths.clone()));

        let err = ReportWriter::persist(&master, "", &paths).await.unwrap_err();
        assert!(matches!(err, AnalysisError::WriteFailed { .. }));
    }
}
