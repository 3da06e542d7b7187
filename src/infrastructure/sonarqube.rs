//! SonarQube integration
//!
//! The scanner leaves a `report-task.txt` properties file behind; its
//! `ceTaskId` identifies the background analysis. The quality gate verdict
//! is read in two steps: the compute-engine task gives the analysis id once
//! processing is done, then the project status of that analysis gives the
//! gate status.

use super::config::SonarConfig;
use crate::executor::{GateStatus, QualityGateService};
use crate::pipeline::PipelineError;
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

/// Contents of the scanner's report-task file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTask {
    /// Compute-engine task id, used as the submission id
    pub ce_task_id: String,
    /// Server the analysis was sent to
    pub server_url: Option<String>,
    /// Dashboard of the analysed project
    pub dashboard_url: Option<String>,
}

/// Parses the scanner's `key=value` report-task file
///
/// # Errors
///
/// Returns [`PipelineError::Config`] when `ceTaskId` is absent.
pub fn parse_report_task(contents: &str) -> Result<ReportTask, PipelineError> {
    let mut ce_task_id = None;
    let mut server_url = None;
    let mut dashboard_url = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "ceTaskId" => ce_task_id = Some(value),
            "serverUrl" => server_url = Some(value),
            "dashboardUrl" => dashboard_url = Some(value),
            _ => {}
        }
    }

    let ce_task_id = ce_task_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| PipelineError::Config("report task has no ceTaskId".to_string()))?;

    Ok(ReportTask {
        ce_task_id,
        server_url,
        dashboard_url,
    })
}

#[derive(Debug, Deserialize)]
struct CeTaskResponse {
    task: CeTask,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CeTask {
    status: String,
    #[serde(default)]
    analysis_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectStatusResponse {
    project_status: ProjectStatus,
}

#[derive(Debug, Deserialize)]
struct ProjectStatus {
    status: String,
}

/// Progress of a compute-engine task
#[derive(Debug, Clone, PartialEq, Eq)]
enum TaskState {
    Pending,
    Failed(String),
    Done { analysis_id: String },
}

fn task_state(task: CeTask) -> Result<TaskState, PipelineError> {
    match task.status.as_str() {
        "PENDING" | "IN_PROGRESS" => Ok(TaskState::Pending),
        "SUCCESS" => task
            .analysis_id
            .map(|analysis_id| TaskState::Done { analysis_id })
            .ok_or_else(|| PipelineError::Http("finished task has no analysisId".to_string())),
        other => Ok(TaskState::Failed(format!("TASK_{other}"))),
    }
}

fn gate_status(status: ProjectStatus) -> GateStatus {
    if status.status == "OK" {
        GateStatus::Passed
    } else {
        GateStatus::Failed {
            status: status.status,
        }
    }
}

/// Quality gate backend speaking the SonarQube web API
#[derive(Clone)]
pub struct SonarQubeClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl SonarQubeClient {
    /// Creates a client for the configured server
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the host URL does not parse.
    pub fn new(config: &SonarConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url(&config.host_url)?,
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PipelineError> {
        self.base_url
            .join(path)
            .map_err(|e| PipelineError::Config(format!("invalid SonarQube endpoint {path}: {e}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: (&str, &str),
    ) -> Result<T, PipelineError> {
        let mut request = self.client.get(self.endpoint(path)?).query(&[query]);
        if let Some(token) = &self.token {
            request = request.basic_auth(token, Some(""));
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl QualityGateService for SonarQubeClient {
    async fn poll(&self, submission_id: &str) -> Result<GateStatus, PipelineError> {
        let task: CeTaskResponse = self.get_json("api/ce/task", ("id", submission_id)).await?;

        match task_state(task.task)? {
            TaskState::Pending => Ok(GateStatus::Pending),
            TaskState::Failed(status) => Ok(GateStatus::Failed { status }),
            TaskState::Done { analysis_id } => {
                tracing::debug!(submission_id, analysis_id = %analysis_id, "Analysis processed");
                let status: ProjectStatusResponse = self
                    .get_json(
                        "api/qualitygates/project_status",
                        ("analysisId", analysis_id.as_str()),
                    )
                    .await?;
                Ok(gate_status(status.project_status))
            }
        }
    }
}

impl std::fmt::Debug for SonarQubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonarQubeClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

/// Parses `url` as a base for relative joins
pub(crate) fn base_url(url: &str) -> Result<Url, PipelineError> {
    let mut base =
        Url::parse(url).map_err(|e| PipelineError::Config(format!("invalid URL '{url}': {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}
