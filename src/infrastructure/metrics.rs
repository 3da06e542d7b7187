//! Metrics collection
//!
//! Keeps the outcome summary of the latest run of each pipeline.

use crate::executor::RunReport;
use crate::pipeline::StageResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Metrics for a pipeline execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineMetrics {
    /// Pipeline name
    pub pipeline_name: String,

    /// Overall result
    pub result: StageResult,

    /// Execution duration
    pub duration: Duration,

    /// Number of stages
    pub stage_count: usize,

    /// Number of successful stages
    pub successful_stages: usize,

    /// Number of failed stages
    pub failed_stages: usize,

    /// Number of unstable stages
    pub unstable_stages: usize,

    /// Number of stages that never ran
    pub skipped_stages: usize,
}

impl From<&RunReport> for PipelineMetrics {
    fn from(report: &RunReport) -> Self {
        Self {
            pipeline_name: report.pipeline.clone(),
            result: report.result,
            duration: report.duration,
            stage_count: report.stages.len(),
            successful_stages: report.count(StageResult::Success),
            failed_stages: report.count(StageResult::Failure),
            unstable_stages: report.count(StageResult::Unstable),
            skipped_stages: report.count(StageResult::Skipped),
        }
    }
}

/// Metrics collector for pipeline executions
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<HashMap<String, PipelineMetrics>>>,
}

impl MetricsCollector {
    /// Creates a new metrics collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records metrics for a pipeline execution, replacing the previous run
    pub fn record(&self, metrics: PipelineMetrics) {
        self.metrics
            .write()
            .insert(metrics.pipeline_name.clone(), metrics);
    }

    /// Gets metrics for a specific pipeline
    #[must_use]
    pub fn get(&self, pipeline_name: &str) -> Option<PipelineMetrics> {
        self.metrics.read().get(pipeline_name).cloned()
    }

    /// Gets all recorded metrics
    #[must_use]
    pub fn get_all(&self) -> Vec<PipelineMetrics> {
        self.metrics.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StageReport;

    fn report(result: StageResult, stages: Vec<StageReport>) -> RunReport {
        RunReport {
            run_id: "run-1".to_string(),
            pipeline: "vprofile".to_string(),
            result,
            stages,
            duration: Duration::from_secs(10),
        }
    }

    fn stage(name: &str, result: StageResult) -> StageReport {
        StageReport {
            name: name.to_string(),
            result,
            duration: Duration::from_secs(1),
            error: None,
        }
    }

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new();

        assert!(collector.get("test").is_none());
        assert!(collector.get_all().is_empty());
    }

    #[test]
    fn test_metrics_from_report() {
        let metrics = PipelineMetrics::from(&report(
            StageResult::Failure,
            vec![
                stage("Build", StageResult::Success),
                stage("Checkstyle", StageResult::Unstable),
                stage("Sonar", StageResult::Failure),
                StageReport::skipped("Publish"),
            ],
        ));

        assert_eq!(metrics.stage_count, 4);
        assert_eq!(metrics.successful_stages, 1);
        assert_eq!(metrics.unstable_stages, 1);
        assert_eq!(metrics.failed_stages, 1);
        assert_eq!(metrics.skipped_stages, 1);
        assert_eq!(metrics.result, StageResult::Failure);
    }

    #[test]
    fn test_metrics_collector_keeps_latest_run() {
        let collector = MetricsCollector::new();

        collector.record(PipelineMetrics::from(&report(
            StageResult::Failure,
            vec![stage("Build", StageResult::Failure)],
        )));
        collector.record(PipelineMetrics::from(&report(
            StageResult::Success,
            vec![stage("Build", StageResult::Success)],
        )));

        let retrieved = collector.get("vprofile").unwrap();
        assert_eq!(retrieved.result, StageResult::Success);
        assert_eq!(collector.get_all().len(), 1);
    }
}
