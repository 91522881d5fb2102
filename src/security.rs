use crate::content::request_error;
use crate::utils::target_url;
use crate::{AnalysisConfig, Probe, ProbeError, ProbeResult, Target};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Presence of the security headers that make up the score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityHeaders {
    pub hsts: bool,
    pub content_security_policy: bool,
    pub x_frame_options: bool,
    pub x_content_type_options: bool,
    pub referrer_policy: bool,
    /// `Permissions-Policy` or its predecessor `Feature-Policy`
    pub feature_policy: bool,
}

impl SecurityHeaders {
    /// Headers are keyed by lowercase name. Empty values count as absent.
    pub fn from_headers(headers: &BTreeMap<String, String>) -> Self {
        let present = |name: &str| headers.get(name).is_some_and(|v| !v.trim().is_empty());
        Self {
            hsts: present("strict-transport-security"),
            content_security_policy: present("content-security-policy"),
            x_frame_options: present("x-frame-options"),
            x_content_type_options: present("x-content-type-options"),
            referrer_policy: present("referrer-policy"),
            feature_policy: present("permissions-policy") || present("feature-policy"),
        }
    }

    /// Weighted score in `0..=100`.
    pub fn score(&self) -> u8 {
        [
            (self.hsts, 20),
            (self.content_security_policy, 20),
            (self.x_frame_options, 15),
            (self.x_content_type_options, 15),
            (self.referrer_policy, 15),
            (self.feature_policy, 15),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, weight)| weight)
        .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    /// Whether the final URL after redirects is served over HTTPS
    pub https: bool,
    #[serde(flatten)]
    pub headers: SecurityHeaders,
    pub security_score: u8,
    pub response_headers: BTreeMap<String, String>,
}

impl SecurityReport {
    pub fn new(final_url_is_https: bool, response_headers: BTreeMap<String, String>) -> Self {
        let headers = SecurityHeaders::from_headers(&response_headers);
        Self {
            https: final_url_is_https,
            security_score: headers.score(),
            headers,
            response_headers,
        }
    }
}

/// Issues one HEAD request per target and inspects the response headers.
pub struct SecurityProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl SecurityProbe {
    pub fn new(config: &AnalysisConfig) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(config.security_timeout)
            .user_agent(config.security_user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            timeout: config.security_timeout,
        })
    }

    async fn inspect(&self, target: &Target) -> Result<SecurityReport, ProbeError> {
        let url = target_url(target);
        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout))?;

        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        debug!("{} returned {} headers", url, headers.len());
        Ok(SecurityReport::new(
            response.url().scheme() == "https",
            headers,
        ))
    }
}

#[async_trait]
impl Probe for SecurityProbe {
    type Output = SecurityReport;

    async fn analyze(&self, target: &Target) -> ProbeResult<SecurityReport> {
        self.inspect(target).await.into()
    }
}
