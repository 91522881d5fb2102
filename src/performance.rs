//! Site-wide performance audits through an external Lighthouse process
//!
//! The runner writes the audit CI configuration and the resource budget
//! first, then audits each URL in turn. A URL whose audit fails or times out
//! is recorded as failed and the remaining URLs still run.

use crate::utils::sanitize_url_token;
use crate::{AnalysisConfig, OutputPaths, ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

/// One external audit of one URL, writing its reports under `output_base`.
#[async_trait]
pub trait AuditCommand: Send + Sync {
    async fn run(&self, url: &str, output_base: &Path) -> Result<(), ProbeError>;
}

/// Spawns `npx lighthouse <url> ...` (or the configured command) with a hard timeout.
pub struct LighthouseCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl LighthouseCommand {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let mut parts = config.audit_command.iter().cloned();
        Self {
            program: parts.next().unwrap_or_else(|| "npx".to_string()),
            args: parts.collect(),
            timeout: config.audit_timeout,
        }
    }

    fn command(&self, url: &str, output_base: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(url)
            .arg("--output=json")
            .arg("--output=html")
            .arg(format!("--output-path={}", output_base.display()))
            .arg("--chrome-flags=--headless --no-sandbox")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl AuditCommand for LighthouseCommand {
    async fn run(&self, url: &str, output_base: &Path) -> Result<(), ProbeError> {
        let child = self.command(url, output_base).spawn().map_err(|e| {
            ProbeError::ProcessSpawnError(format!("could not start {}: {}", self.program, e))
        })?;

        // Dropping the child on timeout kills it
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ProbeError::ProcessSpawnError(format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| ProbeError::ProcessSpawnError(e.to_string()))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        Err(ProbeError::ProcessSpawnError(format!(
            "{} {}",
            output.status,
            detail.trim()
        )
        .trim()
        .to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlAudit {
    pub url: String,
    pub status: AuditStatus,
    /// Base path of the `.report.json` / `.report.html` artifacts
    pub output_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub summary: String,
    pub audits: Vec<UrlAudit>,
}

impl PerformanceSummary {
    pub fn completed(&self) -> usize {
        self.audits
            .iter()
            .filter(|a| a.status == AuditStatus::Complete)
            .count()
    }
}

pub struct PerformanceRunner {
    command: Arc<dyn AuditCommand>,
    paths: OutputPaths,
    audit_user_agent: String,
}

impl PerformanceRunner {
    pub fn new(command: Arc<dyn AuditCommand>, config: &AnalysisConfig) -> Self {
        Self {
            command,
            paths: config.output.clone(),
            audit_user_agent: config.audit_user_agent.clone(),
        }
    }

    pub async fn analyze(&self, urls: &[String]) -> ProbeResult<PerformanceSummary> {
        self.run(urls).await.into()
    }

    async fn run(&self, urls: &[String]) -> Result<PerformanceSummary, ProbeError> {
        self.write_artifacts().await?;
        tokio::fs::create_dir_all(&self.paths.lighthouse_dir).await?;

        let mut audits = Vec::with_capacity(urls.len());
        for url in urls {
            let output_base = self.output_base(url);
            info!("Running performance audit for {}", url);

            let outcome = self.command.run(url, &output_base).await;
            let (status, error) = match outcome {
                Ok(()) => {
                    info!("Performance audit complete for {}", url);
                    (AuditStatus::Complete, None)
                }
                Err(e) => {
                    warn!("Performance audit failed for {}: {}", url, e);
                    (AuditStatus::Failed, Some(e.to_string()))
                }
            };

            audits.push(UrlAudit {
                url: url.clone(),
                status,
                output_path: output_base.display().to_string(),
                error,
            });
        }

        Ok(PerformanceSummary {
            summary: format!(
                "Analysis complete - check {}/",
                self.paths.lighthouse_dir.display()
            ),
            audits,
        })
    }

    pub fn output_base(&self, url: &str) -> PathBuf {
        self.paths.lighthouse_dir.join(sanitize_url_token(url))
    }

    async fn write_artifacts(&self) -> Result<(), ProbeError> {
        let rc = lighthouse_config(&self.paths.budget, &self.audit_user_agent);
        write_json(&self.paths.lighthouse_config, &rc).await?;
        write_json(&self.paths.budget, &performance_budget()).await
    }
}

async fn write_json(path: &Path, value: &Value) -> Result<(), ProbeError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_string_pretty(value)?).await?;
    Ok(())
}

/// Audit CI configuration: three desktop runs, warn-level metric and category thresholds.
pub fn lighthouse_config(budget_path: &Path, user_agent: &str) -> Value {
    let extra_headers = json!({ "User-Agent": user_agent }).to_string();
    json!({
        "ci": {
            "collect": {
                "numberOfRuns": 3,
                "settings": {
                    "preset": "desktop",
                    "budgetPath": budget_path.display().to_string(),
                    "extraHeaders": extra_headers
                }
            },
            "assert": {
                "preset": "lighthouse:recommended",
                "assertions": {
                    "first-contentful-paint": ["warn", { "maxNumericValue": 2000 }],
                    "largest-contentful-paint": ["warn", { "maxNumericValue": 2500 }],
                    "cumulative-layout-shift": ["warn", { "maxNumericValue": 0.1 }],
                    "total-blocking-time": ["warn", { "maxNumericValue": 300 }],
                    "speed-index": ["warn", { "maxNumericValue": 3000 }],
                    "interactive": ["warn", { "maxNumericValue": 3500 }],
                    "categories:performance": ["warn", { "minScore": 0.8 }],
                    "categories:seo": ["warn", { "minScore": 0.9 }],
                    "categories:accessibility": ["warn", { "minScore": 0.85 }],
                    "categories:best-practices": ["warn", { "minScore": 0.9 }]
                }
            }
        }
    })
}

/// Timing budgets in milliseconds, resource sizes in kilobytes.
pub fn performance_budget() -> Value {
    json!([{
        "path": "/*",
        "timings": [
            { "metric": "first-contentful-paint", "budget": 2000 },
            { "metric": "largest-contentful-paint", "budget": 2500 },
            { "metric": "speed-index", "budget": 3000 },
            { "metric": "interactive", "budget": 3500 }
        ],
        "resourceSizes": [
            { "resourceType": "document", "budget": 50 },
            { "resourceType": "script", "budget": 200 },
            { "resourceType": "stylesheet", "budget": 100 },
            { "resourceType": "image", "budget": 300 },
            { "resourceType": "font", "budget": 100 },
            { "resourceType": "total", "budget": 800 }
        ],
        "resourceCounts": [
            { "resourceType": "third-party", "budget": 10 },
            { "resourceType": "total", "budget": 100 }
        ]
    }])
}
