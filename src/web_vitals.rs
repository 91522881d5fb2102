use crate::browser::{BrowserSession, PageExtractor};
use crate::ProbeError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Interaction delay needs real user input, so it is never measured here.
pub const FID_NOTE: &str = "not measured: first input delay requires real user interaction";

/// Observe paint and layout-shift entries for `window`, then resolve with what was seen.
pub fn vitals_script(window: Duration) -> String {
    format!(
        r#"new Promise(resolve => {{
  const vitals = {{ lcp: null, cls: 0, fcp: null, ttfb: null }};
  try {{
    new PerformanceObserver(list => {{
      const entries = list.getEntries();
      const last = entries[entries.length - 1];
      if (last) vitals.lcp = last.renderTime || last.loadTime || last.startTime;
    }}).observe({{ type: 'largest-contentful-paint', buffered: true }});
  }} catch (e) {{}}
  try {{
    new PerformanceObserver(list => {{
      for (const entry of list.getEntries()) {{
        if (!entry.hadRecentInput) vitals.cls += entry.value;
      }}
    }}).observe({{ type: 'layout-shift', buffered: true }});
  }} catch (e) {{}}
  setTimeout(() => {{
    const paint = performance.getEntriesByName('first-contentful-paint')[0];
    if (paint) vitals.fcp = paint.startTime;
    const nav = performance.getEntriesByType('navigation')[0];
    if (nav) vitals.ttfb = nav.responseStart;
    resolve(vitals);
  }}, {});
}})"#,
        window.as_millis()
    )
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VitalsSnapshot {
    pub lcp: Option<f64>,
    pub cls: f64,
    pub fcp: Option<f64>,
    pub ttfb: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VitalRating {
    Good,
    NeedsImprovement,
    Poor,
}

impl VitalRating {
    fn grade(value: f64, good: f64, poor: f64) -> Self {
        if value <= good {
            VitalRating::Good
        } else if value <= poor {
            VitalRating::NeedsImprovement
        } else {
            VitalRating::Poor
        }
    }

    pub fn lcp(ms: f64) -> Self {
        Self::grade(ms, 2500.0, 4000.0)
    }

    pub fn cls(score: f64) -> Self {
        Self::grade(score, 0.1, 0.25)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebVitalsReport {
    pub url: String,
    /// Largest contentful paint in milliseconds
    pub lcp: Option<f64>,
    pub lcp_rating: Option<VitalRating>,
    pub cls: f64,
    pub cls_rating: VitalRating,
    pub fcp: Option<f64>,
    pub ttfb: Option<f64>,
    pub fid: Option<f64>,
    pub fid_note: String,
    pub performance: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl WebVitalsReport {
    pub fn from_snapshot(url: &str, s: VitalsSnapshot, performance: BTreeMap<String, f64>) -> Self {
        let cls = s.cls.max(0.0);
        Self {
            url: url.to_string(),
            lcp: s.lcp,
            lcp_rating: s.lcp.map(VitalRating::lcp),
            cls,
            cls_rating: VitalRating::cls(cls),
            fcp: s.fcp,
            ttfb: s.ttfb,
            fid: None,
            fid_note: FID_NOTE.to_string(),
            performance,
            timestamp: Utc::now(),
        }
    }
}

pub struct WebVitalsExtractor {
    script: String,
}

impl WebVitalsExtractor {
    pub fn new(window: Duration) -> Self {
        Self {
            script: vitals_script(window),
        }
    }
}

#[async_trait]
impl PageExtractor for WebVitalsExtractor {
    type Output = WebVitalsReport;

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<WebVitalsReport, ProbeError> {
        session.navigate(url).await?;
        let raw = session.evaluate(&self.script).await?;
        let snapshot: VitalsSnapshot =
            serde_json::from_value(raw).map_err(|e| ProbeError::ParseError(e.to_string()))?;

        let performance = session.page_metrics().await.unwrap_or_else(|e| {
            debug!("Page metrics unavailable for {}: {}", url, e);
            BTreeMap::new()
        });

        Ok(WebVitalsReport::from_snapshot(url, snapshot, performance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{QueuedLauncher, ScriptedSession};
    use crate::browser::{BrowserProbe, SessionOptions};
    use crate::{AnalysisConfig, Probe, Target, Viewport};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_script_embeds_window() {
        let script = vitals_script(Duration::from_secs(2));
        assert!(script.contains("}, 2000);"));
        assert!(script.contains("hadRecentInput"));
    }

    #[test]
    fn test_ratings() {
        assert_eq!(VitalRating::lcp(1800.0), VitalRating::Good);
        assert_eq!(VitalRating::lcp(3000.0), VitalRating::NeedsImprovement);
        assert_eq!(VitalRating::lcp(5200.0), VitalRating::Poor);
        assert_eq!(VitalRating::cls(0.05), VitalRating::Good);
        assert_eq!(VitalRating::cls(0.3), VitalRating::Poor);
    }

    #[tokio::test]
    async fn test_vitals_through_session() {
        let session = ScriptedSession::answering(vec![(
            "largest-contentful-paint",
            json!({ "lcp": 2100.5, "cls": 0.12, "fcp": 900.0, "ttfb": null }),
        )]);
        let launcher = Arc::new(QueuedLauncher::new(vec![Box::new(session)]));
        let config = AnalysisConfig::default();
        let probe = BrowserProbe::new(
            launcher,
            WebVitalsExtractor::new(config.vitals_window),
            SessionOptions::from_config(&config, Viewport::default()),
        );

        let result = probe.analyze(&Target::from("http://localhost:3000")).await;
        let report = result.success().unwrap();

        assert_eq!(report.url, "http://localhost:3000");
        assert_eq!(report.lcp, Some(2100.5));
        assert_eq!(report.lcp_rating, Some(VitalRating::Good));
        assert_eq!(report.cls_rating, VitalRating::NeedsImprovement);
        assert_eq!(report.fid, None);
        assert_eq!(report.fid_note, FID_NOTE);
        assert_eq!(
            serde_json::to_value(report).unwrap()["fid"],
            serde_json::Value::Null
        );
    }
}
