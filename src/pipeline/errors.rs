//! Error types for pipeline domain

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during pipeline operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Validation failed with specified reason
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// An external command exited with a non-zero code
    #[error("Command `{command}` failed with exit code {code}: {stderr}")]
    ToolExecution {
        /// Command line after variable expansion.
        command: String,
        /// Exit code returned by the command.
        code: i32,
        /// Standard error output from the command.
        stderr: String,
    },

    /// The quality gate returned a negative verdict
    #[error("Quality gate failed for analysis '{submission_id}' with status {status}")]
    QualityGateFailure {
        /// Analysis submission the verdict belongs to.
        submission_id: String,
        /// Status reported by the analysis service.
        status: String,
    },

    /// No quality gate verdict arrived in time
    #[error("Quality gate for analysis '{submission_id}' timed out after {timeout:?}")]
    QualityGateTimeout {
        /// Analysis submission that was awaited.
        submission_id: String,
        /// Upper bound that elapsed.
        timeout: Duration,
    },

    /// An expected build output is missing
    #[error("Artifact not found: {path}")]
    ArtifactNotFound {
        /// Path or glob that matched nothing.
        path: String,
    },

    /// A quality gate was requested before any analysis was submitted
    #[error("No analysis submission recorded before quality gate in stage '{stage}'")]
    MissingSubmission {
        /// Stage holding the quality gate step.
        stage: String,
    },

    /// Remote service call failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration is incomplete or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(String),
}

impl PipelineError {
    /// Returns the kind of this error for reporting
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::ToolExecution { .. } => ErrorKind::ToolExecution,
            Self::QualityGateFailure { .. } => ErrorKind::QualityGateFailure,
            Self::QualityGateTimeout { .. } => ErrorKind::QualityGateTimeout,
            Self::ArtifactNotFound { .. } => ErrorKind::ArtifactNotFound,
            Self::MissingSubmission { .. } => ErrorKind::MissingSubmission,
            Self::Http(_) => ErrorKind::Http,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns true if this error must stop the run even for best-effort stages
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            Self::QualityGateFailure { .. }
                | Self::QualityGateTimeout { .. }
                | Self::MissingSubmission { .. }
        )
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Kind of a [`PipelineError`], as shown in run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Pipeline definition is invalid
    Validation,
    /// External command failed
    ToolExecution,
    /// Quality gate verdict was negative
    QualityGateFailure,
    /// Quality gate verdict did not arrive in time
    QualityGateTimeout,
    /// Expected artifact is missing
    ArtifactNotFound,
    /// Quality gate without a prior analysis
    MissingSubmission,
    /// Remote call failed
    Http,
    /// Bad configuration
    Config,
    /// Local IO failure
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "ValidationError",
            Self::ToolExecution => "ToolExecutionError",
            Self::QualityGateFailure => "QualityGateFailure",
            Self::QualityGateTimeout => "QualityGateTimeout",
            Self::ArtifactNotFound => "ArtifactNotFoundError",
            Self::MissingSubmission => "MissingSubmission",
            Self::Http => "HttpError",
            Self::Config => "ConfigError",
            Self::Io => "IoError",
        };
        f.write_str(name)
    }
}

/// Validation errors for pipeline components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name cannot be empty
    #[error("Name cannot be empty")]
    EmptyName,

    /// Name too long
    #[error("Name too long: max {max} characters, got {len}")]
    NameTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length of the name.
        len: usize,
    },

    /// Pipeline must have at least one stage
    #[error("Pipeline must have at least one stage")]
    EmptyPipeline,

    /// Stage must have at least one step
    #[error("Stage '{stage}' must have at least one step")]
    EmptyStage {
        /// Name of the empty stage.
        stage: String,
    },

    /// Two stages share a name
    #[error("Duplicate stage name: '{stage}'")]
    DuplicateStage {
        /// The repeated name.
        stage: String,
    },

    /// Invalid timeout value
    #[error("Invalid timeout: must be positive, got {value}")]
    InvalidTimeout {
        /// The invalid timeout value.
        value: u64,
    },

    /// A step argument is missing or empty
    #[error("Invalid step {step}: {reason}")]
    InvalidStep {
        /// Display form of the step.
        step: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Definition could not be parsed
    #[error("Invalid pipeline definition: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_names() {
        let err = PipelineError::ArtifactNotFound {
            path: "target/*.war".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::ArtifactNotFound);
        assert_eq!(err.kind().to_string(), "ArtifactNotFoundError");
        assert_eq!(err.to_string(), "Artifact not found: target/*.war");
    }

    #[test]
    fn test_quality_gate_errors_abort() {
        let failure = PipelineError::QualityGateFailure {
            submission_id: "abc123".to_string(),
            status: "ERROR".to_string(),
        };
        let timeout = PipelineError::QualityGateTimeout {
            submission_id: "abc123".to_string(),
            timeout: Duration::from_secs(600),
        };
        assert!(failure.is_abort());
        assert!(timeout.is_abort());
        assert!(
            PipelineError::MissingSubmission {
                stage: "Sonar".to_string()
            }
            .is_abort()
        );
        assert!(!PipelineError::Http("connection refused".to_string()).is_abort());
        assert!(
            !PipelineError::ToolExecution {
                command: "mvn install".to_string(),
                code: 1,
                stderr: String::new(),
            }
            .is_abort()
        );
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: PipelineError = ValidationError::EmptyPipeline.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "Validation failed: Pipeline must have at least one stage"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PipelineError = io.into();
        assert_eq!(err, PipelineError::Io("missing".to_string()));
    }
}
