//! `stagegate run` - Execute a pipeline
//!
//! Wires the shell invoker, the SonarQube client and the Nexus client into a
//! [`StageRunner`], runs the pipeline on a current-thread runtime and maps the
//! overall result to the process exit code.

use anyhow::{Context, Result};
use stagegate::executor::{PipelineExecutor, RunReport, ShellInvoker, StageRunner};
use stagegate::infrastructure::{Config, NexusClient, SonarQubeClient, init_logging};
use stagegate::pipeline::Pipeline;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Options of a `run` invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Pipeline file
    pub file: PathBuf,
    /// Configuration file
    pub config: Option<PathBuf>,
    /// Workspace override
    pub workspace: Option<PathBuf>,
    /// Build number override
    pub build_number: Option<u64>,
    /// Only validate and list stages
    pub dry_run: bool,
}

/// Resolves the configuration: file, then environment, then command line
pub fn resolve_config(
    options: &RunOptions,
    env: &HashMap<String, String>,
) -> Result<Config> {
    let config = match &options.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => Config::default(),
    };
    let mut config = config
        .with_env_overrides(env)
        .context("Invalid environment configuration")?;

    if let Some(workspace) = &options.workspace {
        config.workspace.clone_from(workspace);
    }
    if let Some(build_number) = options.build_number {
        config.build_number = build_number;
    }
    Ok(config)
}

/// Runs the pipeline described by `options`
pub fn run_pipeline(options: &RunOptions) -> Result<ExitCode> {
    let report = execute(options)?;
    print!("{}", render_summary(&report));
    Ok(ExitCode::from(report.exit_code()))
}

/// Loads, wires and executes the pipeline, returning its report
pub fn execute(options: &RunOptions) -> Result<RunReport> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let config = resolve_config(options, &env)?;
    init_logging(&config.log_level);

    let pipeline = Pipeline::from_file(&options.file)
        .with_context(|| format!("Failed to load pipeline: {}", options.file.display()))?;

    let config = Arc::new(config);
    let gate = SonarQubeClient::new(&config.sonar).context("Invalid SonarQube configuration")?;
    let repository = NexusClient::new(&config.nexus).context("Invalid Nexus configuration")?;
    let runner = StageRunner::new(
        Arc::new(ShellInvoker::new()),
        Arc::new(gate),
        Arc::new(repository),
        config,
    )
    .with_base_env(env);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let report = runtime.block_on(async {
        if options.dry_run {
            runner.dry_run(&pipeline).await
        } else {
            runner.execute(&pipeline).await
        }
    })?;
    Ok(report)
}

/// Human readable run summary
pub fn render_summary(report: &RunReport) -> String {
    let width = report
        .stages
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for stage in &report.stages {
        let _ = writeln!(
            out,
            "{:<width$}  {:<8}  {:.1}s",
            stage.name,
            stage.result.to_string(),
            stage.duration.as_secs_f64()
        );
    }
    let _ = writeln!(out, "Pipeline {} finished: {}", report.pipeline, report.result);
    if let Some((stage, error)) = report.failure() {
        let _ = writeln!(out, "Failed at stage '{stage}': [{}] {error}", error.kind());
    }
    out
}
