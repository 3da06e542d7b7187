//! Configuration management
//!
//! Configuration comes from an optional YAML file, then environment
//! variables override individual fields. The result is shared read-only by
//! every component of a run.

use crate::pipeline::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level
    pub log_level: String,
    /// Workspace root every step runs in
    pub workspace: PathBuf,
    /// Job name exposed as `JOB_NAME`
    pub job_name: String,
    /// Build number exposed as `BUILD_NUMBER` and `BUILD_ID`
    pub build_number: u64,
    /// Archive directory, relative to the workspace
    pub archive_dir: String,
    /// Default upper bound for quality gate waits
    pub quality_gate_timeout_secs: u64,
    /// Code analysis service
    pub sonar: SonarConfig,
    /// Artifact repository
    pub nexus: NexusConfig,
}

/// SonarQube connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonarConfig {
    /// Server base URL
    pub host_url: String,
    /// Authentication token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Delay between two quality gate polls
    pub poll_interval_secs: u64,
}

/// Nexus connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NexusConfig {
    /// `http` or `https`
    pub protocol: String,
    /// Host name or address
    pub host: String,
    /// Port
    pub port: u16,
    /// Repository used when an upload step names none
    pub repository: String,
    /// Credential reference used when an upload step names none
    pub credentials_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            workspace: PathBuf::from("."),
            job_name: "stagegate".to_string(),
            build_number: 1,
            archive_dir: ".stagegate/archive".to_string(),
            quality_gate_timeout_secs: 600,
            sonar: SonarConfig::default(),
            nexus: NexusConfig::default(),
        }
    }
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            host_url: "http://localhost:9000".to_string(),
            token: None,
            poll_interval_secs: 5,
        }
    }
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 8081,
            repository: "maven-releases".to_string(),
            credentials_id: "nexuslogin".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be read and
    /// [`PipelineError::Config`] if it is not valid YAML.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Io(format!("cannot read {}: {e}", path.display())))?;
        serde_yaml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))
    }

    /// Applies environment overrides
    ///
    /// Recognized variables: `STAGEGATE_LOG`, `WORKSPACE`, `JOB_NAME`,
    /// `BUILD_NUMBER`, `SONAR_HOST_URL`, `SONAR_TOKEN`, `NEXUS_PROTOCOL`,
    /// `NEXUSIP`, `NEXUSPORT`, `RELEASE_REPO` and `NEXUS_LOGIN`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when a numeric variable does not parse.
    pub fn with_env_overrides<I, K, V>(mut self, vars: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let value = value.into();
            match key.as_ref() {
                "STAGEGATE_LOG" => self.log_level = value,
                "WORKSPACE" => self.workspace = PathBuf::from(value),
                "JOB_NAME" => self.job_name = value,
                "BUILD_NUMBER" => self.build_number = parse_number("BUILD_NUMBER", &value)?,
                "SONAR_HOST_URL" => self.sonar.host_url = value,
                "SONAR_TOKEN" => self.sonar.token = Some(value),
                "NEXUS_PROTOCOL" => self.nexus.protocol = value,
                "NEXUSIP" => self.nexus.host = value,
                "NEXUSPORT" => self.nexus.port = parse_number("NEXUSPORT", &value)?,
                "RELEASE_REPO" => self.nexus.repository = value,
                "NEXUS_LOGIN" => self.nexus.credentials_id = value,
                _ => {}
            }
        }
        Ok(self)
    }

    /// Default quality gate timeout
    #[must_use]
    pub fn quality_gate_timeout(&self) -> Duration {
        Duration::from_secs(self.quality_gate_timeout_secs)
    }

    /// Absolute archive directory
    #[must_use]
    pub fn archive_root(&self) -> PathBuf {
        self.workspace.join(&self.archive_dir)
    }
}

impl SonarConfig {
    /// Delay between two quality gate polls
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl NexusConfig {
    /// `protocol://host:port` without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, PipelineError> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::Config(format!("{key} must be a number, got '{value}'")))
}
