//! Post-run data quality assessment
//!
//! Grades each of the ten report streams by how many of its probes
//! succeeded, then derives completeness and accuracy percentages for the
//! master report.

use crate::{Category, CategoryOutcome};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Number of streams a complete report carries.
pub const EXPECTED_STREAMS: usize = 10;

/// Accuracy points lost per stream that produced no data at all.
const ACCURACY_PENALTY: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamStatus {
    /// Every probe in the stream succeeded
    Success,
    /// Some probes succeeded
    Partial,
    /// No probe in the stream succeeded
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuality {
    pub stream: String,
    pub status: StreamStatus,
    pub data_points: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub streams: Vec<StreamQuality>,
    /// Percentage of expected streams that fully succeeded
    pub completeness: f64,
    pub accuracy: f64,
    pub overall: HealthLevel,
}

impl DataQuality {
    pub fn stream(&self, category: Category) -> Option<&StreamQuality> {
        self.streams.iter().find(|s| s.stream == category.as_str())
    }
}

fn stream_status(outcome: &CategoryOutcome) -> StreamStatus {
    match (outcome.succeeded, outcome.failed) {
        (0, _) => StreamStatus::Error,
        (_, 0) => StreamStatus::Success,
        _ => StreamStatus::Partial,
    }
}

/// Grade the streams of one run.
pub fn assess(outcomes: &[(Category, CategoryOutcome)]) -> DataQuality {
    let streams: Vec<StreamQuality> = outcomes
        .iter()
        .map(|(category, outcome)| StreamQuality {
            stream: category.as_str().to_string(),
            status: stream_status(outcome),
            data_points: outcome.succeeded,
            failures: outcome.failed,
        })
        .collect();

    let successful = streams
        .iter()
        .filter(|s| s.status == StreamStatus::Success)
        .count();
    let errored = streams
        .iter()
        .filter(|s| s.status == StreamStatus::Error)
        .count();

    let completeness = (successful as f64 / EXPECTED_STREAMS as f64 * 100.0).round();
    let accuracy = (100.0 - ACCURACY_PENALTY * errored as f64).max(0.0);

    let overall = if errored * 2 >= EXPECTED_STREAMS {
        HealthLevel::Critical
    } else if successful < EXPECTED_STREAMS {
        HealthLevel::Warning
    } else {
        HealthLevel::Healthy
    };

    for stream in streams.iter().filter(|s| s.status != StreamStatus::Success) {
        warn!(
            "Stream {} {:?}: {} ok, {} failed",
            stream.stream, stream.status, stream.data_points, stream.failures
        );
    }
    info!(
        "Data quality {:?}: completeness {}%, accuracy {}%",
        overall, completeness, accuracy
    );

    DataQuality {
        streams,
        completeness,
        accuracy,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(succeeded: usize, failed: usize) -> CategoryOutcome {
        CategoryOutcome { succeeded, failed }
    }

    fn all_streams(f: impl Fn(Category) -> CategoryOutcome) -> Vec<(Category, CategoryOutcome)> {
        let mut categories = Category::PER_TARGET.to_vec();
        categories.extend([
            Category::Performance,
            Category::Keywords,
            Category::WebVitals,
            Category::LinkProfile,
        ]);
        categories.into_iter().map(|c| (c, f(c))).collect()
    }

    #[test]
    fn test_all_streams_successful() {
        let quality = assess(&all_streams(|_| outcome(10, 0)));
        assert_eq!(quality.completeness, 100.0);
        assert_eq!(quality.accuracy, 100.0);
        assert_eq!(quality.overall, HealthLevel::Healthy);
        assert_eq!(quality.streams.len(), EXPECTED_STREAMS);
    }

    #[test]
    fn test_partial_and_errored_streams() {
        let quality = assess(&all_streams(|c| match c {
            Category::Mobile => outcome(7, 3),
            Category::WebVitals => outcome(0, 1),
            _ => outcome(10, 0),
        }));

        assert_eq!(
            quality.stream(Category::Mobile).unwrap().status,
            StreamStatus::Partial
        );
        assert_eq!(
            quality.stream(Category::WebVitals).unwrap().status,
            StreamStatus::Error
        );
        assert_eq!(quality.completeness, 80.0);
        assert_eq!(quality.accuracy, 90.0);
        assert_eq!(quality.overall, HealthLevel::Warning);
    }

    #[test]
    fn test_mostly_failed_run_is_critical() {
        let quality = assess(&all_streams(|c| match c {
            Category::Competitor | Category::Keywords | Category::LinkProfile => outcome(1, 0),
            _ => outcome(0, 4),
        }));
        assert_eq!(quality.accuracy, 30.0);
        assert_eq!(quality.overall, HealthLevel::Critical);
        assert_eq!(
            serde_json::to_value(quality.streams[0].status).unwrap(),
            "ERROR"
        );
    }
}
