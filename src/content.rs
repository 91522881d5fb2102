//! Content analysis over raw HTML
//!
//! The probe fetches the page once and derives every metric with regular
//! expressions over the response body. No DOM is built, so counts reflect
//! markup as served rather than the rendered page.

use crate::estimator::{Estimator, SocialSignals};
use crate::utils::{host_of, is_same_site, round2, target_host, target_url};
use crate::{AnalysisConfig, Probe, ProbeError, ProbeResult, Target};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<h([1-6])[^>]*>").unwrap());
static ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<a[^>]*href=").unwrap());
static ABSOLUTE_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a[^>]*href=["'](https?://[^"']+)["']"#).unwrap()
});
static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img[^>]*>").unwrap());
static META_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*name=["']keywords["'][^>]*content=["']([^"']*)["'][^>]*>"#)
        .unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

pub const TOPICS: [&str; 10] = [
    "casino reviews",
    "game guides",
    "bonuses",
    "slots",
    "blackjack",
    "roulette",
    "poker",
    "live dealer",
    "mobile casino",
    "payment methods",
];

pub const DENSITY_KEYWORDS: [&str; 5] = ["casino", "gambling", "slots", "bonus", "game"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadingCounts {
    pub h1: usize,
    pub h2: usize,
    pub h3: usize,
    pub h4: usize,
    pub h5: usize,
    pub h6: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkCounts {
    pub total: usize,
    pub internal: usize,
    pub external: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Freshness {
    pub total_dates: usize,
    pub recent_dates: usize,
    pub freshness_score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetrics {
    pub word_count: usize,
    pub heading_count: HeadingCounts,
    pub link_count: LinkCounts,
    pub image_count: usize,
    pub meta_keywords: Vec<String>,
    /// Whether each topic phrase appears anywhere in the page
    pub content_topics: BTreeMap<String, bool>,
    pub readability_score: f64,
    /// Percentage of words containing each keyword, two decimals
    pub keyword_density: BTreeMap<String, f64>,
    pub content_freshness: Freshness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentReport {
    pub url: String,
    pub status: u16,
    #[serde(flatten)]
    pub metrics: ContentMetrics,
    pub social_signals: SocialSignals,
}

/// Derive content metrics from an HTML document served by `site_host`.
pub fn analyze_html(site_host: &str, html: &str, current_year: i32) -> ContentMetrics {
    let text = TAG.replace_all(html, "");

    ContentMetrics {
        word_count: WORD.find_iter(html).count(),
        heading_count: count_headings(html),
        link_count: count_links(site_host, html),
        image_count: IMAGE.find_iter(html).count(),
        meta_keywords: meta_keywords(html),
        content_topics: content_topics(html),
        readability_score: readability_score(&text),
        keyword_density: keyword_density(&text),
        content_freshness: freshness(html, current_year),
    }
}

fn count_headings(html: &str) -> HeadingCounts {
    let mut counts = HeadingCounts::default();
    for caps in HEADING.captures_iter(html) {
        match &caps[1] {
            "1" => counts.h1 += 1,
            "2" => counts.h2 += 1,
            "3" => counts.h3 += 1,
            "4" => counts.h4 += 1,
            "5" => counts.h5 += 1,
            _ => counts.h6 += 1,
        }
    }
    counts
}

fn count_links(site_host: &str, html: &str) -> LinkCounts {
    let total = ANCHOR.find_iter(html).count();
    let external = ABSOLUTE_HREF
        .captures_iter(html)
        .filter(|caps| match host_of(&caps[1]) {
            Some(host) => !is_same_site(&host, site_host),
            None => false,
        })
        .count();

    LinkCounts {
        total,
        internal: total.saturating_sub(external),
        external,
    }
}

fn meta_keywords(html: &str) -> Vec<String> {
    META_KEYWORDS
        .captures(html)
        .map(|caps| {
            caps[1]
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn content_topics(html: &str) -> BTreeMap<String, bool> {
    let lower = html.to_lowercase();
    TOPICS
        .iter()
        .map(|topic| (topic.to_string(), lower.contains(topic)))
        .collect()
}

/// `206.835 - 1.015 * (words / sentences)`, never below zero.
pub fn readability_score(text: &str) -> f64 {
    let words = text.split_whitespace().count();
    let sentences = SENTENCE_END
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    (206.835 - 1.015 * (words as f64 / sentences as f64)).max(0.0)
}

fn keyword_density(text: &str) -> BTreeMap<String, f64> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    DENSITY_KEYWORDS
        .iter()
        .map(|keyword| {
            let density = if words.is_empty() {
                0.0
            } else {
                let count = words.iter().filter(|w| w.contains(keyword)).count();
                round2(count as f64 / words.len() as f64 * 100.0)
            };
            (keyword.to_string(), density)
        })
        .collect()
}

fn freshness(html: &str, current_year: i32) -> Freshness {
    let years: Vec<i32> = YEAR
        .find_iter(html)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    let recent = years
        .iter()
        .filter(|y| (current_year - 1..=current_year).contains(*y))
        .count();

    Freshness {
        total_dates: years.len(),
        recent_dates: recent,
        freshness_score: if recent > 0 { "Fresh" } else { "Stale" }.to_string(),
    }
}

/// Fetches a target's home page with one bounded GET. Social signals come
/// from the estimator once the page has loaded.
pub struct ContentProbe {
    client: reqwest::Client,
    timeout: Duration,
    estimator: Arc<dyn Estimator>,
}

impl ContentProbe {
    pub fn new(config: &AnalysisConfig, estimator: Arc<dyn Estimator>) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(config.content_timeout)
            .user_agent(config.content_user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            timeout: config.content_timeout,
            estimator,
        })
    }

    async fn fetch(&self, target: &Target) -> Result<ContentReport, ProbeError> {
        let url = target_url(target);
        let site_host = target_host(target)
            .ok_or_else(|| ProbeError::ConfigurationError(format!("Invalid target: {target}")))?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout))?;
        let status = response.status().as_u16();
        let html = response
            .text()
            .await
            .map_err(|e| request_error(e, self.timeout))?;

        debug!("Fetched {} bytes from {} ({})", html.len(), url, status);

        let metrics = analyze_html(&site_host, &html, Utc::now().year());
        let social_signals = self.estimator.social_signals(target).await?;

        Ok(ContentReport {
            url,
            status,
            metrics,
            social_signals,
        })
    }
}

pub(crate) fn request_error(e: reqwest::Error, timeout: Duration) -> ProbeError {
    if e.is_timeout() {
        ProbeError::NetworkError(format!("request timed out after {timeout:?}"))
    } else {
        ProbeError::from(e)
    }
}

#[async_trait]
impl Probe for ContentProbe {
    type Output = ContentReport;

    async fn analyze(&self, target: &Target) -> ProbeResult<ContentReport> {
        self.fetch(target).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::ModeledEstimator;
    use httpmock::prelude::*;

    fn estimator() -> Arc<dyn Estimator> {
        Arc::new(ModeledEstimator::new(0))
    }

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta name="keywords" content="casino, slots , bonus,">
<title>Casino Reviews 2025</title>
</head><body>
<h1 class="hero">Casino Reviews</h1>
<h2>Slots</h2><h2>Blackjack</h2><h3>Live Dealer</h3>
<p>Updated 2025. Our casino experts rate every bonus! Established 1998.</p>
<a href="/guides">Game guides</a>
<a href="https://blog.casino.org/news">News</a>
<a href="https://askgamblers.com/">Partner</a>
<a href='http://example.com/x'>Other</a>
<img src="a.png"><IMG SRC="b.webp" alt="b">
</body></html>"#;

    #[test]
    fn test_analyze_html() {
        let metrics = analyze_html("casino.org", PAGE, 2025);

        assert_eq!(
            metrics.heading_count,
            HeadingCounts {
                h1: 1,
                h2: 2,
                h3: 1,
                ..Default::default()
            }
        );
        assert_eq!(
            metrics.link_count,
            LinkCounts {
                total: 4,
                internal: 2,
                external: 2
            }
        );
        assert_eq!(metrics.image_count, 2);
        assert_eq!(metrics.meta_keywords, vec!["casino", "slots", "bonus"]);
        assert!(metrics.content_topics["casino reviews"]);
        assert!(metrics.content_topics["live dealer"]);
        assert!(!metrics.content_topics["poker"]);
        assert_eq!(metrics.content_topics.len(), TOPICS.len());
        assert_eq!(metrics.content_freshness.total_dates, 3);
        assert_eq!(metrics.content_freshness.recent_dates, 2);
        assert_eq!(metrics.content_freshness.freshness_score, "Fresh");
        assert!(metrics.word_count > 20);
    }

    #[test]
    fn test_readability_never_negative() {
        assert_eq!(readability_score(""), 206.835);
        assert_eq!(readability_score("  \n\t"), 206.835);
        let run_on = "word ".repeat(5000);
        assert_eq!(readability_score(&run_on), 0.0);
        assert!(readability_score("Short. Simple. Text.") > 200.0);
    }

    #[test]
    fn test_keyword_density() {
        let density = keyword_density("casino casino slots bonus words");
        assert_eq!(density["casino"], 40.0);
        assert_eq!(density["slots"], 20.0);
        assert_eq!(density["gambling"], 0.0);

        let empty = keyword_density("   ");
        assert!(empty.values().all(|d| *d == 0.0));
        assert_eq!(empty.len(), DENSITY_KEYWORDS.len());
    }

    #[test]
    fn test_freshness_ignores_old_and_future_years() {
        let stale = freshness("since 1999, copyright 2019, roadmap 2031", 2025);
        assert_eq!(stale.total_dates, 3);
        assert_eq!(stale.recent_dates, 0);
        assert_eq!(stale.freshness_score, "Stale");
    }

    #[tokio::test]
    async fn test_content_probe_fetches_page() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .header("content-type", "text/html")
                .body(PAGE);
        });

        let probe = ContentProbe::new(&AnalysisConfig::default(), estimator()).unwrap();
        let result = probe.analyze(&Target::from(server.base_url())).await;

        page.assert();
        let report = result.success().unwrap();
        assert_eq!(report.status, 200);
        assert_eq!(report.metrics.heading_count.h2, 2);
        let target = Target::from(server.base_url());
        assert_eq!(report.social_signals, ModeledEstimator::new(0).social(&target));
    }

    #[tokio::test]
    async fn test_content_probe_timeout_is_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).delay(Duration::from_millis(500)).body(PAGE);
        });

        let config = AnalysisConfig {
            content_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let probe = ContentProbe::new(&config, estimator()).unwrap();
        let result = probe.analyze(&Target::from(server.base_url())).await;

        assert_eq!(
            result.error(),
            Some("Network error: request timed out after 50ms")
        );
    }
}
