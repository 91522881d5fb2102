use std::time::Duration;
use thiserror::Error;
use tokio::sync::AcquireError;

/// Failure raised inside a single probe invocation.
///
/// Probes never let one of these escape: the probe boundary turns it into a
/// `ProbeResult::Failure` carrying the rendered message.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("Navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Audit process failed: {0}")]
    ProcessSpawnError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Page error: {0}")]
    PageError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Semaphore acquire error: {0}")]
    SemaphoreError(String),

    #[error("Probe task failed: {0}")]
    TaskFailed(String),
}

impl ProbeError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ProbeError::ParseError(_) => ErrorSeverity::Low,
            ProbeError::NavigationTimeout(_) | ProbeError::NetworkError(_) => ErrorSeverity::Medium,
            ProbeError::ConfigurationError(_) => ErrorSeverity::High,
            ProbeError::BrowserLaunchFailed(_) => ErrorSeverity::High,
            ProbeError::TaskFailed(_) => ErrorSeverity::High,
            _ => ErrorSeverity::Medium,
        }
    }

    /// Stable label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::NavigationTimeout(_) => "navigation_timeout",
            ProbeError::NetworkError(_) => "network",
            ProbeError::ProcessSpawnError(_) => "process",
            ProbeError::ParseError(_) => "parse",
            ProbeError::BrowserLaunchFailed(_) => "browser_launch",
            ProbeError::PageError(_) => "page",
            ProbeError::IoError(_) => "io",
            ProbeError::SerializationError(_) => "serialization",
            ProbeError::ConfigurationError(_) => "configuration",
            ProbeError::SemaphoreError(_) => "semaphore",
            ProbeError::TaskFailed(_) => "task",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
}

/// Errors that end a whole analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AcquireError> for ProbeError {
    fn from(err: AcquireError) -> Self {
        ProbeError::SemaphoreError(err.to_string())
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        ProbeError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        ProbeError::NetworkError(err.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for ProbeError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ProbeError::PageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        assert_eq!(ProbeError::ParseError("bad".into()).severity(), ErrorSeverity::Low);
        assert_eq!(
            ProbeError::NavigationTimeout(Duration::from_secs(30)).severity(),
            ErrorSeverity::Medium
        );
        assert_eq!(
            ProbeError::BrowserLaunchFailed("no chrome".into()).severity(),
            ErrorSeverity::High
        );
    }

    #[test]
    fn test_error_display() {
        let err = ProbeError::NavigationTimeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Navigation timed out after 30s");
        assert_eq!(err.kind(), "navigation_timeout");

        let err = ProbeError::NetworkError("connection refused".into());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }
}
