use crate::browser::{BrowserSession, PageExtractor};
use crate::ProbeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Collects the raw text of every JSON-LD block on the page.
pub const JSON_LD_SCRIPT: &str = r#"(() => Array.from(
  document.querySelectorAll('script[type="application/ld+json"]')
).map(s => s.textContent || ''))()"#;

/// Schema.org types the report flags individually.
const FLAGGED_TYPES: [&str; 6] = [
    "Organization",
    "WebSite",
    "Article",
    "Review",
    "Product",
    "BreadcrumbList",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReport {
    pub schema_types: Vec<String>,
    pub schema_count: usize,
    pub has_organization: bool,
    pub has_website: bool,
    pub has_article: bool,
    pub has_review: bool,
    pub has_product: bool,
    pub has_breadcrumbs: bool,
    pub raw_schemas: Vec<Value>,
}

impl SchemaReport {
    pub fn from_blocks(blocks: &[String]) -> Self {
        let raw_schemas = parse_json_ld(blocks);

        let mut schema_types = Vec::new();
        for schema in &raw_schemas {
            collect_types(schema, &mut schema_types);
        }

        let has = |name: &str| schema_types.iter().any(|t| t == name);
        let [organization, website, article, review, product, breadcrumbs] = FLAGGED_TYPES.map(has);

        Self {
            schema_count: raw_schemas.len(),
            has_organization: organization,
            has_website: website,
            has_article: article,
            has_review: review,
            has_product: product,
            has_breadcrumbs: breadcrumbs,
            schema_types,
            raw_schemas,
        }
    }
}

/// Parse JSON-LD block texts, dropping blocks that are not valid JSON.
pub fn parse_json_ld(blocks: &[String]) -> Vec<Value> {
    blocks
        .iter()
        .filter_map(|block| match serde_json::from_str::<Value>(block.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Skipping malformed JSON-LD block: {}", e);
                None
            }
        })
        .collect()
}

/// Every `@type` in a JSON-LD value, including `@graph` members and array forms.
fn collect_types(value: &Value, types: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_types(item, types)),
        Value::Object(map) => {
            match map.get("@type") {
                Some(Value::String(t)) => types.push(t.clone()),
                Some(Value::Array(ts)) => types.extend(
                    ts.iter().filter_map(|t| t.as_str().map(str::to_string)),
                ),
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_types(graph, types);
            }
        }
        _ => {}
    }
}

pub struct SchemaExtractor;

#[async_trait]
impl PageExtractor for SchemaExtractor {
    type Output = SchemaReport;

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<SchemaReport, ProbeError> {
        session.navigate(url).await?;
        let raw = session.evaluate(JSON_LD_SCRIPT).await?;
        let blocks: Vec<String> =
            serde_json::from_value(raw).map_err(|e| ProbeError::ParseError(e.to_string()))?;
        Ok(SchemaReport::from_blocks(&blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{QueuedLauncher, ScriptedSession};
    use crate::browser::{BrowserProbe, SessionOptions};
    use crate::{AnalysisConfig, Probe, Target, Viewport};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn blocks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flags_and_types() {
        let report = SchemaReport::from_blocks(&blocks(&[
            r#"{"@context":"https://schema.org","@type":"Organization","name":"Casino Portal"}"#,
            r#"{"@type":["WebSite","Thing"]}"#,
            r#"{"@graph":[{"@type":"BreadcrumbList"},{"@type":"Review"}]}"#,
        ]));

        assert_eq!(report.schema_count, 3);
        assert_eq!(
            report.schema_types,
            vec!["Organization", "WebSite", "Thing", "BreadcrumbList", "Review"]
        );
        assert!(report.has_organization);
        assert!(report.has_website);
        assert!(report.has_breadcrumbs);
        assert!(report.has_review);
        assert!(!report.has_article);
        assert!(!report.has_product);
    }

    #[test]
    fn test_malformed_blocks_are_skipped() {
        let report = SchemaReport::from_blocks(&blocks(&[
            r#"{"@type": "Product", "name": "#,
            "",
            r#"  {"@type":"Article"}  "#,
        ]));

        assert_eq!(report.schema_count, 1);
        assert_eq!(report.schema_types, vec!["Article"]);
        assert!(report.has_article);
        assert!(!report.has_product);
    }

    #[tokio::test]
    async fn test_schema_probe_through_session() {
        let session = ScriptedSession::answering(vec![(
            "ld+json",
            json!([r#"{"@type":"Product"}"#, "not json"]),
        )]);
        let closed = session.closed.clone();
        let launcher = Arc::new(QueuedLauncher::new(vec![Box::new(session)]));
        let probe = BrowserProbe::new(
            launcher,
            SchemaExtractor,
            SessionOptions::from_config(&AnalysisConfig::default(), Viewport::default()),
        );

        let result = probe.analyze(&Target::from("casino.guru")).await;

        let report = result.success().unwrap();
        assert!(report.has_product);
        assert_eq!(report.raw_schemas, vec![json!({"@type": "Product"})]);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
