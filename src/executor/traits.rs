//! Pipeline execution traits
//!
//! This module defines the executor interface, the per-run context and the
//! report a run produces.

use crate::infrastructure::Config;
use crate::pipeline::{Pipeline, PipelineError, StageResult, ValidationError};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Trait for executing pipelines
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    /// Executes a pipeline and returns the run report
    ///
    /// # Errors
    ///
    /// Returns an error only when the run cannot start (invalid definition,
    /// unusable workspace). Stage failures are part of the report.
    async fn execute(&self, pipeline: &Pipeline) -> Result<RunReport, PipelineError>;

    /// Validates a pipeline without executing it
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    fn validate(&self, pipeline: &Pipeline) -> Result<(), ValidationError>;

    /// Performs a dry run of the pipeline (no side effects)
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] for invalid definitions.
    async fn dry_run(&self, pipeline: &Pipeline) -> Result<RunReport, PipelineError>;
}

/// Context for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Immutable configuration of the run
    pub config: Arc<Config>,

    /// Environment variables visible to every step
    pub env: HashMap<String, String>,

    /// Workspace root
    pub workspace: PathBuf,

    /// Unique run identifier
    pub run_id: String,

    /// Analysis submission awaiting a quality gate verdict
    pub submission_id: Option<String>,
}

impl PipelineContext {
    /// Creates a context with build variables derived from `config`
    ///
    /// `base_env` is usually the process environment.
    #[must_use]
    pub fn new(config: Arc<Config>, base_env: HashMap<String, String>) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let workspace = config.workspace.clone();

        let mut env = base_env;
        env.insert(
            "WORKSPACE".to_string(),
            workspace.to_string_lossy().to_string(),
        );
        env.insert("JOB_NAME".to_string(), config.job_name.clone());
        env.insert("BUILD_NUMBER".to_string(), config.build_number.to_string());
        env.insert("BUILD_ID".to_string(), config.build_number.to_string());
        env.insert(
            "BUILD_TIMESTAMP".to_string(),
            chrono::Local::now().format("%Y-%m-%d_%H-%M").to_string(),
        );
        env.insert("RUN_ID".to_string(), run_id.clone());

        Self {
            config,
            env,
            workspace,
            run_id,
            submission_id: None,
        }
    }

    /// Expands `${VAR}` references against the run environment
    #[must_use]
    pub fn expand(&self, value: &str) -> String {
        super::expand_variables(value, &self.env)
    }

    /// Resolves a step directory against the workspace
    #[must_use]
    pub fn working_dir(&self, dir: Option<&str>) -> PathBuf {
        match dir {
            Some(dir) => self.workspace.join(self.expand(dir)),
            None => self.workspace.clone(),
        }
    }
}

/// Outcome of one stage in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Stage name
    pub name: String,
    /// Stage outcome
    pub result: StageResult,
    /// Wall time spent in the stage, post actions included
    pub duration: Duration,
    /// Error that failed the stage
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<PipelineError>,
}

impl StageReport {
    /// Report for a stage that never ran
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: StageResult::Skipped,
            duration: Duration::ZERO,
            error: None,
        }
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: String,
    /// Pipeline name
    pub pipeline: String,
    /// Overall outcome
    pub result: StageResult,
    /// Per-stage outcomes in declaration order
    pub stages: Vec<StageReport>,
    /// Total wall time
    pub duration: Duration,
}

impl RunReport {
    /// Returns the halting stage and its error
    #[must_use]
    pub fn failure(&self) -> Option<(&str, &PipelineError)> {
        self.stages
            .iter()
            .find(|s| s.result.is_failure())
            .and_then(|s| s.error.as_ref().map(|e| (s.name.as_str(), e)))
    }

    /// Returns the report of a stage by name
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Number of stages with the given result
    #[must_use]
    pub fn count(&self, result: StageResult) -> usize {
        self.stages.iter().filter(|s| s.result == result).count()
    }

    /// Process exit code: 0 for success or unstable, 1 for failure
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(self.result.is_failure())
    }
}

#[allow(clippy::ref_option)]
fn serialize_error<S>(error: &Option<PipelineError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    #[derive(Serialize)]
    struct ErrorView {
        kind: String,
        message: String,
    }

    error
        .as_ref()
        .map(|e| ErrorView {
            kind: e.kind().to_string(),
            message: e.to_string(),
        })
        .serialize(serializer)
}
