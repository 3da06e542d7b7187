//! Stage runner
//!
//! [`StageRunner`] drives a pipeline run: stages in declared order, steps in
//! declared order within a stage, post actions keyed by the stage outcome,
//! and a halt on the first failing stage. Remaining stages are reported as
//! skipped and never start.

use super::invoker::{Invocation, ToolInvoker};
use super::publisher::{ArtifactPublisher, ArtifactRepository};
use super::quality_gate::{QualityGateService, QualityGateWaiter};
use super::traits::{PipelineContext, PipelineExecutor, RunReport, StageReport};
use crate::infrastructure::{Config, MetricsCollector, PipelineMetrics, parse_report_task};
use crate::pipeline::{
    BuildArtifact, CredentialRef, Pipeline, PipelineError, RepositoryCoordinates, Stage,
    StageResult, Step, StepType, UploadSpec, Validate, ValidationError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stage name used for pipeline-level post actions
const PIPELINE_POST: &str = "post";

/// A failed step, and whether best-effort may absorb it
#[derive(Debug)]
struct StepFailure {
    error: PipelineError,
    abort: bool,
}

impl StepFailure {
    /// Any error out of a quality gate step aborts the run
    fn new(step: &Step, error: PipelineError) -> Self {
        let abort = error.is_abort() || matches!(step.step_type, StepType::QualityGate { .. });
        Self { error, abort }
    }
}

/// Executes pipelines against external tools and services
#[derive(Clone)]
pub struct StageRunner {
    invoker: Arc<dyn ToolInvoker>,
    gate: QualityGateWaiter,
    publisher: ArtifactPublisher,
    config: Arc<Config>,
    base_env: HashMap<String, String>,
    metrics: Option<MetricsCollector>,
}

impl StageRunner {
    /// Creates a runner over the given tool, gate and repository backends
    #[must_use]
    pub fn new(
        invoker: Arc<dyn ToolInvoker>,
        gate_service: Arc<dyn QualityGateService>,
        repository: Arc<dyn ArtifactRepository>,
        config: Arc<Config>,
    ) -> Self {
        let gate = QualityGateWaiter::new(gate_service).with_poll_interval(config.sonar.poll_interval());
        Self {
            invoker,
            gate,
            publisher: ArtifactPublisher::new(repository),
            config,
            base_env: HashMap::new(),
            metrics: None,
        }
    }

    /// Sets the environment every run starts from
    #[must_use]
    pub fn with_base_env(mut self, env: HashMap<String, String>) -> Self {
        self.base_env = env;
        self
    }

    /// Records a metrics summary after each run
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replaces the quality gate waiter
    #[must_use]
    pub fn with_gate(mut self, gate: QualityGateWaiter) -> Self {
        self.gate = gate;
        self
    }

    /// Configuration shared by every run
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn new_context(&self, pipeline: &Pipeline) -> PipelineContext {
        let mut context = PipelineContext::new(self.config.clone(), self.base_env.clone());
        context.env = pipeline.environment.resolve_all(&context.env);
        context
    }

    async fn run_stage(&self, stage: &Stage, context: &mut PipelineContext) -> StageReport {
        let start = Instant::now();
        tracing::info!(stage = %stage.name, steps = stage.steps.len(), "Executing stage");

        let (mut result, mut error) = match self.run_steps(&stage.name, &stage.steps, context).await {
            Ok(()) => (StageResult::Success, None),
            Err(StepFailure { error, abort: false }) if stage.best_effort => {
                tracing::warn!(stage = %stage.name, error = %error, "Best-effort stage failed, marking unstable");
                (StageResult::Unstable, Some(error))
            }
            Err(failure) => (StageResult::Failure, Some(failure.error)),
        };

        let outcome = result;
        for condition in stage.post.iter().filter(|c| c.should_execute(outcome)) {
            tracing::debug!(stage = %stage.name, post = %condition, "Running post actions");
            if let Err(StepFailure { error: e, .. }) =
                self.run_steps(&stage.name, condition.steps(), context).await
            {
                if result.is_success() {
                    tracing::error!(stage = %stage.name, error = %e, "Post action failed");
                    result = StageResult::Failure;
                    error = Some(e);
                } else {
                    tracing::warn!(stage = %stage.name, error = %e, "Post action failed, keeping stage outcome");
                }
            }
        }

        let duration = start.elapsed();
        tracing::info!(
            stage = %stage.name,
            result = %result,
            duration_ms = duration.as_millis(),
            "Stage completed"
        );

        StageReport {
            name: stage.name.clone(),
            result,
            duration,
            error,
        }
    }

    async fn run_steps(
        &self,
        stage: &str,
        steps: &[Step],
        context: &mut PipelineContext,
    ) -> Result<(), StepFailure> {
        for step in steps {
            self.run_step(stage, step, context)
                .await
                .map_err(|error| StepFailure::new(step, error))?;
        }
        Ok(())
    }

    async fn run_step(
        &self,
        stage: &str,
        step: &Step,
        context: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        tracing::debug!(stage, step = %step.step_type, name = ?step.name, "Executing step");
        let working_dir = context.working_dir(step.dir.as_deref());

        match &step.step_type {
            StepType::Shell { command } => {
                self.invoke(stage, command, &working_dir, &step.outputs, &[], context)
                    .await
            }
            StepType::Echo { message } => {
                println!("{}", context.expand(message));
                Ok(())
            }
            StepType::SonarScan {
                command,
                report_task,
            } => {
                let mut extra = vec![("SONAR_HOST_URL", self.config.sonar.host_url.clone())];
                if let Some(token) = &self.config.sonar.token {
                    extra.push(("SONAR_TOKEN", token.clone()));
                }
                self.invoke(stage, command, &working_dir, &step.outputs, &extra, context)
                    .await?;

                let path = working_dir.join(context.expand(report_task));
                let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    PipelineError::Io(format!("cannot read report task {}: {e}", path.display()))
                })?;
                let report = parse_report_task(&contents)?;
                tracing::info!(
                    stage,
                    submission_id = %report.ce_task_id,
                    dashboard = ?report.dashboard_url,
                    "Analysis submitted"
                );
                context.submission_id = Some(report.ce_task_id);
                Ok(())
            }
            StepType::QualityGate { timeout_secs } => {
                let submission_id =
                    context
                        .submission_id
                        .clone()
                        .ok_or_else(|| PipelineError::MissingSubmission {
                            stage: stage.to_string(),
                        })?;
                let timeout = timeout_secs
                    .map_or_else(|| self.config.quality_gate_timeout(), Duration::from_secs);
                self.gate
                    .wait(&submission_id, timeout)
                    .await?
                    .into_result(&submission_id, timeout)
            }
            StepType::ArchiveArtifacts { pattern } => {
                let archived = self.archive(&context.expand(pattern), context).await?;
                tracing::info!(stage, files = archived.len(), "Artifacts archived");
                Ok(())
            }
            StepType::NexusUpload(spec) => self.publish(stage, spec, context).await,
        }
    }

    async fn invoke(
        &self,
        stage: &str,
        command: &str,
        working_dir: &Path,
        outputs: &[String],
        extra_env: &[(&str, String)],
        context: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let mut env = context.env.clone();
        env.insert("STAGE_NAME".to_string(), stage.to_string());
        for (key, value) in extra_env {
            env.insert((*key).to_string(), value.clone());
        }

        let mut invocation = Invocation::new(context.expand(command), working_dir).with_env(env);
        for pattern in outputs {
            invocation = invocation.with_output(context.expand(pattern));
        }

        let output = self.invoker.invoke(&invocation).await?;
        tracing::debug!(
            stage,
            exit_code = output.exit_code,
            duration_ms = output.duration.as_millis(),
            produced = output.produced_files.len(),
            "Command finished"
        );
        Ok(())
    }

    /// Copies workspace files matching `pattern` into the archive directory
    async fn archive(
        &self,
        pattern: &str,
        context: &PipelineContext,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let archive_root = context.workspace.join(&self.config.archive_dir);
        let glob_path = context.workspace.join(pattern);
        let glob_str = glob_path.to_string_lossy().to_string();

        let mut matches = glob::glob(&glob_str)
            .map_err(|e| PipelineError::Config(format!("invalid archive pattern '{pattern}': {e}")))?
            .filter_map(Result::ok)
            .filter(|p| p.is_file() && !p.starts_with(&archive_root))
            .collect::<Vec<_>>();
        matches.sort();

        if matches.is_empty() {
            return Err(PipelineError::ArtifactNotFound { path: glob_str });
        }

        let mut archived = Vec::with_capacity(matches.len());
        for source in matches {
            let relative = source.strip_prefix(&context.workspace).map_err(|_| {
                PipelineError::Config(format!(
                    "{} is outside the workspace",
                    source.display()
                ))
            })?;
            let destination = archive_root.join(relative);
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&source, &destination).await?;
            archived.push(destination);
        }
        Ok(archived)
    }

    async fn publish(
        &self,
        stage: &str,
        spec: &UploadSpec,
        context: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let version = context.expand(&spec.version);
        let artifact = BuildArtifact::locate(
            &context.workspace,
            &context.expand(&spec.artifact_pattern()),
            context.expand(&spec.packaging),
            version.clone(),
            &context.expand(&spec.descriptor),
        )?;

        let coordinates = RepositoryCoordinates {
            group_id: context.expand(&spec.group_id),
            artifact_id: context.expand(&spec.artifact_id),
            version,
            repository: spec
                .repository
                .as_deref()
                .map_or_else(|| self.config.nexus.repository.clone(), |r| context.expand(r)),
            credentials: CredentialRef::new(spec.credentials_id.as_deref().map_or_else(
                || self.config.nexus.credentials_id.clone(),
                |c| context.expand(c),
            )),
        };

        let credentials = coordinates.credentials.resolve(&context.env)?;

        let result = self
            .publisher
            .publish(&artifact, &coordinates, &credentials)
            .await?;
        tracing::info!(
            stage,
            repository = %result.repository,
            coordinates = %result.coordinates,
            files = ?result.files,
            "Artifact published"
        );
        Ok(())
    }

    async fn run_pipeline_post(
        &self,
        pipeline: &Pipeline,
        result: StageResult,
        context: &mut PipelineContext,
    ) {
        for condition in pipeline.post.iter().filter(|c| c.should_execute(result)) {
            if let Err(failure) = self.run_steps(PIPELINE_POST, condition.steps(), context).await {
                tracing::warn!(post = %condition, error = %failure.error, "Pipeline post action failed");
            }
        }
    }

    fn finish(&self, report: RunReport) -> RunReport {
        if let Some(metrics) = &self.metrics {
            metrics.record(PipelineMetrics::from(&report));
        }
        report
    }
}

#[async_trait]
impl PipelineExecutor for StageRunner {
    async fn execute(&self, pipeline: &Pipeline) -> Result<RunReport, PipelineError> {
        pipeline.validate()?;
        if !self.config.workspace.is_dir() {
            return Err(PipelineError::Config(format!(
                "workspace {} is not a directory",
                self.config.workspace.display()
            )));
        }

        let start = Instant::now();
        let mut context = self.new_context(pipeline);
        let pipeline_name = pipeline_name(pipeline);
        tracing::info!(
            pipeline = %pipeline_name,
            run_id = %context.run_id,
            stages = pipeline.stages.len(),
            "Starting pipeline execution"
        );

        let mut overall = StageResult::Success;
        let mut stages = Vec::with_capacity(pipeline.stages.len());
        for stage in &pipeline.stages {
            if overall.is_failure() {
                tracing::info!(stage = %stage.name, "Skipping stage after failure");
                stages.push(StageReport::skipped(&stage.name));
                continue;
            }

            let report = self.run_stage(stage, &mut context).await;
            overall = overall.combine(report.result);
            if let Some(error) = report.error.as_ref().filter(|_| report.result.is_failure()) {
                tracing::error!(
                    stage = %stage.name,
                    kind = %error.kind(),
                    error = %error,
                    "Stage failed, stopping pipeline"
                );
            }
            stages.push(report);
        }

        self.run_pipeline_post(pipeline, overall, &mut context).await;

        let duration = start.elapsed();
        tracing::info!(
            pipeline = %pipeline_name,
            result = %overall,
            duration_ms = duration.as_millis(),
            "Pipeline completed"
        );

        Ok(self.finish(RunReport {
            run_id: context.run_id,
            pipeline: pipeline_name,
            result: overall,
            stages,
            duration,
        }))
    }

    fn validate(&self, pipeline: &Pipeline) -> Result<(), ValidationError> {
        pipeline.validate()
    }

    async fn dry_run(&self, pipeline: &Pipeline) -> Result<RunReport, PipelineError> {
        pipeline.validate()?;
        let pipeline_name = pipeline_name(pipeline);
        tracing::info!(pipeline = %pipeline_name, "Starting dry run");

        let stages = pipeline
            .stages
            .iter()
            .map(|stage| {
                tracing::info!(stage = %stage.name, steps = stage.steps.len(), "Would execute stage");
                for step in &stage.steps {
                    tracing::debug!(step = %step.step_type, "Would execute step");
                }
                StageReport::skipped(&stage.name)
            })
            .collect();

        Ok(RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            pipeline: pipeline_name,
            result: StageResult::Success,
            stages,
            duration: Duration::ZERO,
        })
    }
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner")
            .field("gate", &self.gate)
            .field("publisher", &self.publisher)
            .field("workspace", &self.config.workspace)
            .finish_non_exhaustive()
    }
}

fn pipeline_name(pipeline: &Pipeline) -> String {
    pipeline
        .name
        .clone()
        .unwrap_or_else(|| "unnamed".to_string())
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
