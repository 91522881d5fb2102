//! Configuration management with serde serialization/deserialization
//!
//! This module provides the run configuration for the analysis engine: the
//! competitor target list, the local URLs audited by the global probes,
//! per-probe timeouts, the concurrency cap and the output layout.

use crate::{ProbeError, Target};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for one analysis run
///
/// Built once before a run and shared read-only with every probe. Defaults
/// reproduce the portal's competitor list and local audit URLs.
///
/// # Examples
///
/// ```rust
/// use competitor_intel::AnalysisConfig;
///
/// // Use default configuration
/// let config = AnalysisConfig::default();
/// assert_eq!(config.targets.len(), 10);
///
/// // Narrow the run to two competitors
/// let config = AnalysisConfig {
///     targets: vec!["casino.org".into(), "casino.guru".into()],
///     max_concurrent_probes: 4,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Competitor domains probed by every per-target category
    pub targets: Vec<Target>,

    /// Local URLs audited by the external performance tool
    pub performance_urls: Vec<String>,

    /// Local URL observed by the Core Web Vitals probe
    pub web_vitals_url: String,

    /// Maximum number of probe invocations in flight across all categories
    ///
    /// Every browser session, HTTP request and estimator call holds one
    /// permit while it runs, so this bounds simultaneous Chrome processes
    /// independently of the target list size.
    pub max_concurrent_probes: usize,

    /// Timeout for the content GET request (default: 15 seconds)
    pub content_timeout: Duration,

    /// Timeout for the security HEAD request (default: 30 seconds)
    pub security_timeout: Duration,

    /// Hard ceiling for a browser navigation including the idle wait (default: 30 seconds)
    pub navigation_timeout: Duration,

    /// Quiet period without new requests that counts as network idle (default: 500ms)
    pub network_quiet_window: Duration,

    /// How long paint and layout-shift entries are observed (default: 2 seconds)
    pub vitals_window: Duration,

    /// Timeout for one external audit process (default: 60 seconds)
    pub audit_timeout: Duration,

    /// User-Agent sent by the content probe
    pub content_user_agent: String,

    /// User-Agent sent by the security probe
    pub security_user_agent: String,

    /// User-Agent injected into the audit tool configuration
    pub audit_user_agent: String,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Viewport emulated by the mobile probe
    pub mobile_viewport: Viewport,

    /// Program and leading arguments of the audit tool
    pub audit_command: Vec<String>,

    /// Seed mixed into every modeled estimate
    pub estimator_seed: u64,

    /// Where artifacts are written
    pub output: OutputPaths,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            targets: DEFAULT_TARGETS.iter().map(|t| Target::from(*t)).collect(),
            performance_urls: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
            web_vitals_url: "http://localhost:3000".to_string(),
            max_concurrent_probes: (num_cpus::get() * 2).max(2),
            content_timeout: Duration::from_secs(15),
            security_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
            network_quiet_window: Duration::from_millis(500),
            vitals_window: Duration::from_secs(2),
            audit_timeout: Duration::from_secs(60),
            content_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            security_user_agent: "Casino-Portal-Security-Audit/1.0".to_string(),
            audit_user_agent: "Casino-Portal-SEO-Bot/1.0".to_string(),
            chrome_path: None,
            mobile_viewport: Viewport::mobile(),
            audit_command: vec!["npx".to_string(), "lighthouse".to_string()],
            estimator_seed: 0,
            output: OutputPaths::default(),
        }
    }
}

const DEFAULT_TARGETS: &[&str] = &[
    "casino.ca",
    "askgamblers.com",
    "casino.guru",
    "casinomeister.com",
    "casinolistings.com",
    "onlinecasinos.com",
    "gamblingsites.com",
    "casino.org",
    "vegasslotsonline.com",
    "casinoguide.ca",
];

impl AnalysisConfig {
    /// Reject configurations that would break the one-entry-per-target contract
    /// or make probes fail before they start.
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.targets.is_empty() {
            return Err(ProbeError::ConfigurationError(
                "At least one target is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.as_str().trim().is_empty() {
                return Err(ProbeError::ConfigurationError(
                    "Targets must not be blank".to_string(),
                ));
            }
            if !seen.insert(target.as_str()) {
                return Err(ProbeError::ConfigurationError(format!(
                    "Duplicate target: {target}"
                )));
            }
        }

        if self.max_concurrent_probes == 0 {
            return Err(ProbeError::ConfigurationError(
                "Max concurrent probes must be greater than 0".to_string(),
            ));
        }

        let timeouts = [
            ("content_timeout", self.content_timeout),
            ("security_timeout", self.security_timeout),
            ("navigation_timeout", self.navigation_timeout),
            ("audit_timeout", self.audit_timeout),
        ];
        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(ProbeError::ConfigurationError(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        if self.audit_command.is_empty() {
            return Err(ProbeError::ConfigurationError(
                "Audit command must name a program".to_string(),
            ));
        }

        if self.mobile_viewport.width == 0 || self.mobile_viewport.height == 0 {
            return Err(ProbeError::ConfigurationError(
                "Viewport dimensions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Browser viewport emulated for a session
///
/// # Examples
///
/// ```rust
/// use competitor_intel::Viewport;
///
/// let mobile = Viewport::mobile();
/// assert_eq!((mobile.width, mobile.height), (375, 667));
/// assert!(mobile.has_touch);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,

    /// Device pixel ratio for high-DPI displays
    pub device_scale_factor: f64,

    /// Whether to emulate a mobile device
    pub mobile: bool,

    /// Whether touch events are emulated
    pub has_touch: bool,
}

impl Viewport {
    pub fn mobile() -> Self {
        Self {
            width: 375,
            height: 667,
            device_scale_factor: 2.0,
            mobile: true,
            has_touch: true,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 1.0,
            mobile: false,
            has_touch: false,
        }
    }
}

/// Filesystem layout of the artifacts written by one run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputPaths {
    pub root: PathBuf,
    pub master_report: PathBuf,
    pub markdown_report: PathBuf,
    pub lighthouse_config: PathBuf,
    pub budget: PathBuf,
    pub lighthouse_dir: PathBuf,
}

impl OutputPaths {
    /// Lay out every artifact path under `base`.
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let root = base.join("analysis-results");
        Self {
            master_report: root.join("MASTER-SEO-ANALYSIS-REPORT.json"),
            markdown_report: base.join("ADVANCED-SEO-ANALYSIS-COMPLETE.md"),
            lighthouse_config: base.join("lighthouserc.json"),
            budget: root.join("performance").join("budget.json"),
            lighthouse_dir: root.join("lighthouse"),
            root,
        }
    }

    /// Directories created before any probe runs.
    pub fn directories(&self) -> Vec<PathBuf> {
        vec![
            self.root.clone(),
            self.root.join("competitors"),
            self.root.join("technical"),
            self.root.join("performance"),
            self.root.join("content"),
            self.lighthouse_dir.clone(),
        ]
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self::under(".")
    }
}

/// Generate Chrome command-line arguments for one isolated probe session
///
/// Every session gets its own user data and temp directory so concurrent
/// sessions never trip Chrome's process singleton.
///
/// # Examples
///
/// ```rust
/// use competitor_intel::{Viewport, get_chrome_args};
///
/// let args = get_chrome_args(&Viewport::default(), "session-1");
/// assert!(args.contains(&"--headless".to_string()));
/// assert!(args.contains(&"--window-size=1920,1080".to_string()));
/// ```
pub fn get_chrome_args(viewport: &Viewport, session_id: &str) -> Vec<String> {
    vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--disable-features=TranslateUI,ProcessSingleton".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        format!("--window-size={},{}", viewport.width, viewport.height),
        format!("--temp-dir=/tmp/competitor-intel-temp-{session_id}"),
    ]
}

/// Build the chromiumoxide launch configuration for one session.
pub fn create_browser_config(
    config: &AnalysisConfig,
    viewport: &Viewport,
    session_id: &str,
) -> Result<chromiumoxide::browser::BrowserConfig, ProbeError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(viewport.width, viewport.height)
        .user_data_dir(format!("/tmp/competitor-intel-{session_id}"))
        .request_timeout(config.navigation_timeout)
        .args(get_chrome_args(viewport, session_id));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(ProbeError::BrowserLaunchFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AnalysisConfig::default();
        assert_eq!(config.targets.len(), 10);
        assert_eq!(config.targets[0].as_str(), "casino.ca");
        assert_eq!(config.content_timeout, Duration::from_secs(15));
        assert_eq!(config.navigation_timeout, Duration::from_secs(30));
        assert_eq!(config.audit_timeout, Duration::from_secs(60));
        assert_eq!(config.vitals_window, Duration::from_secs(2));
        assert_eq!(config.performance_urls.len(), 2);
        assert!(config.max_concurrent_probes >= 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_targets_rejected() {
        let config = AnalysisConfig {
            targets: vec!["a.com".into(), "b.com".into(), "a.com".into()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate target: a.com"));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let empty = AnalysisConfig {
            targets: vec![],
            ..Default::default()
        };
        assert!(empty.validate().is_err());

        let no_workers = AnalysisConfig {
            max_concurrent_probes: 0,
            ..Default::default()
        };
        assert!(no_workers.validate().is_err());

        let no_timeout = AnalysisConfig {
            audit_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(no_timeout.validate().is_err());

        let no_command = AnalysisConfig {
            audit_command: vec![],
            ..Default::default()
        };
        assert!(no_command.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "targets": ["casino.org"], "max_concurrent_probes": 3 }"#)
                .unwrap();
        assert_eq!(config.targets, vec![Target::from("casino.org")]);
        assert_eq!(config.max_concurrent_probes, 3);
        assert_eq!(config.mobile_viewport, Viewport::mobile());
    }

    #[test]
    fn test_output_layout() {
        let paths = OutputPaths::under("/work");
        assert_eq!(
            paths.master_report,
            PathBuf::from("/work/analysis-results/MASTER-SEO-ANALYSIS-REPORT.json")
        );
        assert_eq!(
            paths.markdown_report,
            PathBuf::from("/work/ADVANCED-SEO-ANALYSIS-COMPLETE.md")
        );
        assert_eq!(paths.lighthouse_config, PathBuf::from("/work/lighthouserc.json"));
        assert_eq!(
            paths.budget,
            PathBuf::from("/work/analysis-results/performance/budget.json")
        );
        assert_eq!(paths.directories().len(), 6);
    }

    #[test]
    fn test_chrome_args_generation() {
        let args = get_chrome_args(&Viewport::mobile(), "abc");
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--disable-setuid-sandbox".to_string()));
        assert!(args.contains(&"--window-size=375,667".to_string()));
        assert!(args.contains(&"--temp-dir=/tmp/competitor-intel-temp-abc".to_string()));
    }
}
