//! Probe contract shared by every analyzer
//!
//! A probe takes one [`Target`] and always yields exactly one
//! [`ProbeResult`]. Errors are folded into `ProbeResult::Failure` at the probe
//! boundary so a batch of probes can never be aborted by one of its members.

use crate::{ErrorSeverity, ProbeError};
use async_trait::async_trait;
use metrics::increment_counter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// An opaque competitor identifier, usually a bare domain such as `casino.org`.
///
/// A target that already carries a scheme (`http://localhost:3000`) is used
/// verbatim when a probe builds its request URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Outcome of one probe invocation.
///
/// Serializes as the bare payload on success and as `{"error": "..."}` on
/// failure, which is the shape consumers of the master report read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeResult<T> {
    Failure { error: String },
    Success(T),
}

impl<T> ProbeResult<T> {
    pub fn failure(error: impl fmt::Display) -> Self {
        ProbeResult::Failure {
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            ProbeResult::Success(value) => Some(value),
            ProbeResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ProbeResult::Success(_) => None,
            ProbeResult::Failure { error } => Some(error),
        }
    }
}

impl<T> From<Result<T, ProbeError>> for ProbeResult<T> {
    fn from(result: Result<T, ProbeError>) -> Self {
        match result {
            Ok(value) => ProbeResult::Success(value),
            Err(e) => {
                increment_counter!("probe_errors_total", "kind" => e.kind());
                if e.severity() == ErrorSeverity::High {
                    warn!("Probe error ({}): {}", e.kind(), e);
                } else {
                    debug!("Probe error ({}): {}", e.kind(), e);
                }
                ProbeResult::failure(e)
            }
        }
    }
}

/// Results of one category keyed by target. Always holds one entry per input target.
pub type CategoryResultMap<T> = BTreeMap<Target, ProbeResult<T>>;

/// A single analyzer run against one target.
#[async_trait]
pub trait Probe: Send + Sync {
    type Output: Send + 'static;

    async fn analyze(&self, target: &Target) -> ProbeResult<Self::Output>;
}

/// Analysis streams that make up a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    TechnicalSeo,
    Content,
    Competitor,
    Schema,
    Mobile,
    Security,
    Performance,
    Keywords,
    WebVitals,
    LinkProfile,
}

impl Category {
    pub const PER_TARGET: [Category; 6] = [
        Category::TechnicalSeo,
        Category::Content,
        Category::Competitor,
        Category::Schema,
        Category::Mobile,
        Category::Security,
    ];

    /// Key of the category's section in the aggregate report.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TechnicalSeo => "technicalSEO",
            Category::Content => "contentAnalysis",
            Category::Competitor => "competitorGaps",
            Category::Schema => "schemaMarkup",
            Category::Mobile => "mobileOptimization",
            Category::Security => "securityAnalysis",
            Category::Performance => "performanceMetrics",
            Category::Keywords => "keywordOpportunities",
            Category::WebVitals => "coreWebVitals",
            Category::LinkProfile => "linkProfile",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
