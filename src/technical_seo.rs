use crate::browser::{BrowserSession, NetworkSummary, PageExtractor};
use crate::schema::parse_json_ld;
use crate::utils::is_same_site;
use crate::ProbeError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub const TECHNICAL_SEO_SCRIPT: &str = r#"(() => {
  const meta = {};
  document.querySelectorAll('meta').forEach(m => {
    const key = m.getAttribute('name') || m.getAttribute('property') || m.getAttribute('http-equiv');
    const content = m.getAttribute('content');
    if (key && content !== null) meta[key] = content;
  });

  const headings = {};
  for (let level = 1; level <= 6; level++) {
    headings['h' + level] = Array.from(document.querySelectorAll('h' + level)).map(h => ({
      text: (h.textContent || '').trim(),
      id: h.id || null
    }));
  }

  const links = Array.from(document.querySelectorAll('a[href]')).map(a => ({
    host: a.hostname || '',
    nofollow: (a.getAttribute('rel') || '').toLowerCase().includes('nofollow')
  }));

  const images = Array.from(document.querySelectorAll('img')).map(img => ({
    hasAlt: (img.getAttribute('alt') || '').trim().length > 0,
    lazy: img.getAttribute('loading') === 'lazy',
    src: img.currentSrc || img.getAttribute('src') || ''
  }));

  const canonical = document.querySelector('link[rel="canonical"]');
  const viewport = document.querySelector('meta[name="viewport"]');
  const text = document.body ? document.body.innerText || '' : '';

  return {
    host: location.hostname,
    title: document.title || '',
    meta,
    headings,
    links,
    images,
    canonical: canonical ? canonical.href : null,
    viewport: viewport ? viewport.getAttribute('content') : null,
    charset: document.characterSet || null,
    doctype: document.doctype ? document.doctype.name : null,
    wordCount: text.split(/\s+/).filter(Boolean).length,
    structuredData: Array.from(document.querySelectorAll('script[type="application/ld+json"]'))
      .map(s => s.textContent || '')
  };
})()"#;

/// Raw values returned by [`TECHNICAL_SEO_SCRIPT`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageSnapshot {
    pub host: String,
    pub title: String,
    pub meta: BTreeMap<String, String>,
    pub headings: BTreeMap<String, Vec<Heading>>,
    pub links: Vec<RawLink>,
    pub images: Vec<RawImage>,
    pub canonical: Option<String>,
    pub viewport: Option<String>,
    pub charset: Option<String>,
    pub doctype: Option<String>,
    pub word_count: usize,
    pub structured_data: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    pub text: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLink {
    pub host: String,
    pub nofollow: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawImage {
    pub has_alt: bool,
    pub lazy: bool,
    pub src: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkStats {
    pub total: usize,
    pub internal: usize,
    pub external: usize,
    pub nofollow: usize,
}

impl LinkStats {
    /// Links without a host (`mailto:`, `javascript:`) count toward the total only.
    pub fn classify(links: &[RawLink], site_host: &str) -> Self {
        let mut stats = LinkStats {
            total: links.len(),
            ..Default::default()
        };
        for link in links {
            if link.nofollow {
                stats.nofollow += 1;
            }
            if link.host.is_empty() {
                continue;
            }
            if is_same_site(&link.host, site_host) {
                stats.internal += 1;
            } else {
                stats.external += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStats {
    pub total: usize,
    pub with_alt: usize,
    pub without_alt: usize,
    pub lazy: usize,
    pub webp: usize,
}

impl ImageStats {
    pub fn from_images(images: &[RawImage]) -> Self {
        let with_alt = images.iter().filter(|i| i.has_alt).count();
        Self {
            total: images.len(),
            with_alt,
            without_alt: images.len() - with_alt,
            lazy: images.iter().filter(|i| i.lazy).count(),
            webp: images.iter().filter(|i| is_webp(&i.src)).count(),
        }
    }
}

fn is_webp(src: &str) -> bool {
    let src = src.to_ascii_lowercase();
    let path = src.split(['?', '#']).next().unwrap_or_default();
    path.ends_with(".webp") || src.starts_with("data:image/webp")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSeoReport {
    pub url: String,
    pub title: String,
    pub meta: BTreeMap<String, String>,
    pub headings: BTreeMap<String, Vec<Heading>>,
    pub links: LinkStats,
    pub images: ImageStats,
    pub canonical: Option<String>,
    pub viewport: Option<String>,
    pub charset: Option<String>,
    pub doctype: Option<String>,
    pub word_count: usize,
    pub structured_data: Vec<Value>,
    pub network: NetworkSummary,
    pub performance: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl TechnicalSeoReport {
    pub fn from_snapshot(
        url: &str,
        snapshot: PageSnapshot,
        network: NetworkSummary,
        performance: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            url: url.to_string(),
            links: LinkStats::classify(&snapshot.links, &snapshot.host),
            images: ImageStats::from_images(&snapshot.images),
            structured_data: parse_json_ld(&snapshot.structured_data),
            title: snapshot.title,
            meta: snapshot.meta,
            headings: snapshot.headings,
            canonical: snapshot.canonical,
            viewport: snapshot.viewport,
            charset: snapshot.charset,
            doctype: snapshot.doctype,
            word_count: snapshot.word_count,
            network,
            performance,
            timestamp: Utc::now(),
        }
    }
}

pub struct TechnicalSeoExtractor;

#[async_trait]
impl PageExtractor for TechnicalSeoExtractor {
    type Output = TechnicalSeoReport;

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<TechnicalSeoReport, ProbeError> {
        session.navigate(url).await?;

        let raw = session.evaluate(TECHNICAL_SEO_SCRIPT).await?;
        let snapshot: PageSnapshot =
            serde_json::from_value(raw).map_err(|e| ProbeError::ParseError(e.to_string()))?;

        let performance = match session.page_metrics().await {
            Ok(metrics) => metrics,
            Err(e) => {
                debug!("Page metrics unavailable for {}: {}", url, e);
                BTreeMap::new()
            }
        };

        Ok(TechnicalSeoReport::from_snapshot(
            url,
            snapshot,
            session.network_summary(),
            performance,
        ))
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

    fn link(host: &str, nofollow: bool) -> RawLink {
        RawLink {
            host: host.to_string(),
            nofollow,
        }
    }

    #[test]
    fn test_link_classification() {
        let links = vec![
            link("casino.org", false),
            link("www.casino.org", false),
            link("news.casino.org", true),
            link("askgamblers.com", true),
            link("", false),
        ];

        let stats = LinkStats::classify(&links, "casino.org");

        assert_eq!(
            stats,
            LinkStats {
                total: 5,
                internal: 3,
                external: 1,
                nofollow: 2
            }
        );
    }

    #[test]
    fn test_image_stats() {
        let images = vec![
            RawImage {
                has_alt: true,
                lazy: true,
                src: "https://cdn.casino.org/hero.WEBP?w=800".into(),
            },
            RawImage {
                has_alt: false,
                lazy: false,
                src: "/logo.png".into(),
            },
            RawImage {
                has_alt: true,
                lazy: false,
                src: "data:image/webp;base64,AAAA".into(),
            },
        ];

        let stats = ImageStats::from_images(&images);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.with_alt, 2);
        assert_eq!(stats.without_alt, 1);
        assert_eq!(stats.lazy, 1);
        assert_eq!(stats.webp, 2);
    }

    #[tokio::test]
    async fn test_extract_report() {
        let mut session = ScriptedSession::answering(vec![(
            "querySelectorAll('meta')",
            json!({
                "host": "casino.org",
                "title": "Best Online Casinos",
                "meta": { "description": "Reviews", "og:title": "Casino.org" },
                "headings": { "h1": [{ "text": "Top Casinos", "id": "top" }], "h2": [] },
                "links": [{ "host": "casino.org", "nofollow": false }, { "host": "x.com", "nofollow": true }],
                "images": [{ "hasAlt": false, "lazy": true, "src": "a.webp" }],
                "canonical": "https://casino.org/",
                "viewport": "width=device-width, initial-scale=1",
                "charset": "UTF-8",
                "doctype": "html",
                "wordCount": 1520,
                "structuredData": ["{\"@type\":\"Organization\"}", "{broken"]
            }),
        )]);
        session.network = NetworkSummary {
            requests: 42,
            responses: 41,
            failed_responses: 2,
        };
        session.metrics.insert("JSHeapUsedSize".into(), 1024.0);

        let launcher = Arc::new(QueuedLauncher::new(vec![Box::new(session)]));
        let probe = BrowserProbe::new(
            launcher,
            TechnicalSeoExtractor,
            SessionOptions::from_config(&AnalysisConfig::default(), Viewport::default()),
        );

        let result = probe.analyze(&Target::from("casino.org")).await;
        let report = result.success().unwrap();

        assert_eq!(report.url, "https://casino.org");
        assert_eq!(report.title, "Best Online Casinos");
        assert_eq!(report.meta["og:title"], "Casino.org");
        assert_eq!(report.headings["h1"][0].id.as_deref(), Some("top"));
        assert_eq!(report.links.internal, 1);
        assert_eq!(report.links.external, 1);
        assert_eq!(report.images.webp, 1);
        assert_eq!(report.word_count, 1520);
        assert_eq!(report.structured_data, vec![json!({"@type": "Organization"})]);
        assert_eq!(report.network.failed_responses, 2);
        assert_eq!(report.performance["JSHeapUsedSize"], 1024.0);
    }

    #[tokio::test]
    async fn test_unexpected_payload_is_parse_failure() {
        let session = ScriptedSession::answering(vec![("querySelectorAll('meta')", json!("nope"))]);
        let launcher = Arc::new(QueuedLauncher::new(vec![Box::new(session)]));
        let probe = BrowserProbe::new(
            launcher,
            TechnicalSeoExtractor,
            SessionOptions::from_config(&AnalysisConfig::default(), Viewport::default()),
        );

        let result = probe.analyze(&Target::from("casino.org")).await;

        assert!(result.error().unwrap().starts_with("Parse error"));
    }
}
