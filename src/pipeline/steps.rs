//! Step types for pipeline execution
//!
//! This module defines step types that represent atomic units of work.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use super::Validate;
use super::errors::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default location of the scanner's report-task file
pub const DEFAULT_REPORT_TASK: &str = ".scannerwork/report-task.txt";

/// Default descriptor uploaded next to the primary artifact
pub const DEFAULT_DESCRIPTOR: &str = "pom.xml";

fn default_report_task() -> String {
    DEFAULT_REPORT_TASK.to_string()
}

fn default_descriptor() -> String {
    DEFAULT_DESCRIPTOR.to_string()
}

/// Types of steps available in pipelines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepType {
    /// Shell command execution
    Shell {
        /// Command to execute
        command: String,
    },

    /// Echo message
    Echo {
        /// Message to output
        message: String,
    },

    /// Run a code analysis scanner and record its submission
    SonarScan {
        /// Scanner command line
        command: String,
        /// Properties file written by the scanner, relative to the step directory
        #[serde(default = "default_report_task")]
        report_task: String,
    },

    /// Wait for the verdict on the last analysis submission
    QualityGate {
        /// Upper bound in seconds, config default when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_secs: Option<u64>,
    },

    /// Copy matching workspace files into the archive directory
    ArchiveArtifacts {
        /// Glob relative to the workspace
        pattern: String,
    },

    /// Upload a build artifact and its descriptor to the artifact repository
    NexusUpload(UploadSpec),
}

/// Arguments of an artifact upload step
///
/// Every field accepts `${VAR}` references that are resolved against the run
/// environment right before publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSpec {
    /// Maven group id
    pub group_id: String,
    /// Maven artifact id
    pub artifact_id: String,
    /// Version of the upload
    pub version: String,
    /// Packaging type, used as the primary asset extension
    pub packaging: String,
    /// Artifact path or glob, defaults to `target/*.<packaging>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Descriptor uploaded with the artifact
    #[serde(default = "default_descriptor")]
    pub descriptor: String,
    /// Target repository, config default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Credential reference, config default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_id: Option<String>,
}

impl UploadSpec {
    /// Creates an upload spec with default file and descriptor locations
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        packaging: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            packaging: packaging.into(),
            file: None,
            descriptor: default_descriptor(),
            repository: None,
            credentials_id: None,
        }
    }

    /// Sets an explicit artifact path or glob
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets the descriptor path
    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = descriptor.into();
        self
    }

    /// Sets the target repository
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Sets the credential reference
    pub fn with_credentials(mut self, credentials_id: impl Into<String>) -> Self {
        self.credentials_id = Some(credentials_id.into());
        self
    }

    /// Returns the artifact glob, derived from the packaging when no file is set
    pub fn artifact_pattern(&self) -> String {
        self.file
            .clone()
            .unwrap_or_else(|| format!("target/*.{}", self.packaging))
    }
}

impl StepType {
    /// Creates a shell command step
    pub fn shell(command: impl Into<String>) -> Self {
        Self::Shell {
            command: command.into(),
        }
    }

    /// Creates an echo step
    pub fn echo(message: impl Into<String>) -> Self {
        Self::Echo {
            message: message.into(),
        }
    }

    /// Creates a scanner step with the default report-task location
    pub fn sonar_scan(command: impl Into<String>) -> Self {
        Self::SonarScan {
            command: command.into(),
            report_task: default_report_task(),
        }
    }

    /// Creates a quality gate step
    pub fn quality_gate(timeout_secs: Option<u64>) -> Self {
        Self::QualityGate { timeout_secs }
    }

    /// Creates an archive step
    pub fn archive_artifacts(pattern: impl Into<String>) -> Self {
        Self::ArchiveArtifacts {
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell { command } => write!(f, "sh({command})"),
            Self::Echo { message } => write!(f, "echo({message})"),
            Self::SonarScan { command, .. } => write!(f, "sonarScan({command})"),
            Self::QualityGate {
                timeout_secs: Some(secs),
            } => write!(f, "waitForQualityGate({secs}s)"),
            Self::QualityGate { timeout_secs: None } => write!(f, "waitForQualityGate"),
            Self::ArchiveArtifacts { pattern } => write!(f, "archiveArtifacts({pattern})"),
            Self::NexusUpload(spec) => write!(
                f,
                "nexusUpload({}:{}:{})",
                spec.group_id, spec.artifact_id, spec.version
            ),
        }
    }
}

/// A single step in a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Type of step
    #[serde(flatten)]
    pub step_type: StepType,

    /// Optional name for the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Working directory relative to the workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Globs of files this step is expected to produce
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

impl Step {
    /// Creates a new step
    pub fn new(step_type: StepType) -> Self {
        Self {
            step_type,
            name: None,
            dir: None,
            outputs: Vec::new(),
        }
    }

    /// Sets the name of the step
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the working directory of the step
    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Declares a glob of files produced by the step
    pub fn with_output(mut self, pattern: impl Into<String>) -> Self {
        self.outputs.push(pattern.into());
        self
    }

    /// Creates a shell command step
    pub fn shell(command: impl Into<String>) -> Self {
        Self::new(StepType::shell(command))
    }

    /// Creates an echo step
    pub fn echo(message: impl Into<String>) -> Self {
        Self::new(StepType::echo(message))
    }

    /// Creates a scanner step
    pub fn sonar_scan(command: impl Into<String>) -> Self {
        Self::new(StepType::sonar_scan(command))
    }

    /// Creates a quality gate step with the configured default timeout
    pub fn quality_gate() -> Self {
        Self::new(StepType::quality_gate(None))
    }

    /// Creates a quality gate step with an explicit timeout
    pub fn quality_gate_with_timeout(timeout_secs: u64) -> Self {
        Self::new(StepType::quality_gate(Some(timeout_secs)))
    }

    /// Creates an archive step
    pub fn archive_artifacts(pattern: impl Into<String>) -> Self {
        Self::new(StepType::archive_artifacts(pattern))
    }

    /// Creates an artifact upload step
    pub fn nexus_upload(spec: UploadSpec) -> Self {
        Self::new(StepType::NexusUpload(spec))
    }
}

impl Validate for Step {
    type Error = ValidationError;

    fn validate(&self) -> Result<(), Self::Error> {
        let invalid = |reason: &str| ValidationError::InvalidStep {
            step: self.step_type.to_string(),
            reason: reason.to_string(),
        };

        match &self.step_type {
            StepType::Shell { command } | StepType::SonarScan { command, .. } => {
                if command.trim().is_empty() {
                    return Err(invalid("command cannot be empty"));
                }
            }
            StepType::Echo { .. } => {}
            StepType::QualityGate { timeout_secs } => {
                if *timeout_secs == Some(0) {
                    return Err(ValidationError::InvalidTimeout { value: 0 });
                }
            }
            StepType::ArchiveArtifacts { pattern } => {
                if pattern.trim().is_empty() {
                    return Err(invalid("pattern cannot be empty"));
                }
            }
            StepType::NexusUpload(spec) => {
                for (field, value) in [
                    ("group_id", &spec.group_id),
                    ("artifact_id", &spec.artifact_id),
                    ("version", &spec.version),
                    ("packaging", &spec.packaging),
                    ("descriptor", &spec.descriptor),
                ] {
                    if value.trim().is_empty() {
                        return Err(invalid(&format!("{field} cannot be empty")));
                    }
                }
            }
        }

        if let Some(dir) = &self.dir
            && dir.trim().is_empty()
        {
            return Err(invalid("dir cannot be empty"));
        }

        Ok(())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Step({}): {}", name, self.step_type),
            None => write!(f, "Step: {}", self.step_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_type_shell() {
        let step_type = StepType::shell("mvn install");
        assert!(matches!(step_type, StepType::Shell { .. }));
        assert_eq!(step_type.to_string(), "sh(mvn install)");
    }

    #[test]
    fn test_step_with_name_and_dir() {
        let step = Step::shell("mvn install")
            .with_name("Build")
            .with_dir("app");
        assert_eq!(step.name, Some("Build".to_string()));
        assert_eq!(step.dir, Some("app".to_string()));
        assert_eq!(step.to_string(), "Step(Build): sh(mvn install)");
    }

    #[test]
    fn test_sonar_scan_default_report_task() {
        let step = Step::sonar_scan("sonar-scanner");
        assert!(matches!(
            step.step_type,
            StepType::SonarScan { ref report_task, .. } if report_task == DEFAULT_REPORT_TASK
        ));
    }

    #[test]
    fn test_upload_spec_pattern_from_packaging() {
        let spec = UploadSpec::new("QA", "vproapp", "1.0", "war");
        assert_eq!(spec.artifact_pattern(), "target/*.war");
        assert_eq!(spec.descriptor, "pom.xml");

        let spec = spec.with_file("target/vprofile-v2.war");
        assert_eq!(spec.artifact_pattern(), "target/vprofile-v2.war");
    }

    #[test]
    fn test_step_validation() {
        assert!(Step::shell("mvn test").validate().is_ok());
        assert!(Step::shell("  ").validate().is_err());
        assert!(Step::archive_artifacts("").validate().is_err());
        assert!(matches!(
            Step::quality_gate_with_timeout(0).validate(),
            Err(ValidationError::InvalidTimeout { value: 0 })
        ));
        assert!(
            Step::nexus_upload(UploadSpec::new("QA", "", "1.0", "war"))
                .validate()
                .is_err()
        );
        assert!(Step::shell("ls").with_dir("").validate().is_err());
    }

    #[test]
    fn test_step_yaml_shape() {
        let yaml = r"
type: nexus_upload
group_id: QA
artifact_id: vproapp
version: ${BUILD_ID}
packaging: war
";
        let step: Step = serde_yaml::from_str(yaml).unwrap();
        let StepType::NexusUpload(spec) = &step.step_type else {
            panic!("expected upload step, got {}", step.step_type);
        };
        assert_eq!(spec.artifact_id, "vproapp");
        assert_eq!(spec.descriptor, DEFAULT_DESCRIPTOR);
        assert!(spec.repository.is_none());
    }

    #[test]
    fn test_quality_gate_yaml_defaults() {
        let step: Step = serde_yaml::from_str("type: quality_gate").unwrap();
        assert_eq!(step.step_type, StepType::QualityGate { timeout_secs: None });
        assert_eq!(step.step_type.to_string(), "waitForQualityGate");
    }
}
