//! Pipeline definition and builder

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use crate::pipeline::Environment;
use crate::pipeline::errors::{PipelineError, ValidationError};
use crate::pipeline::post::PostCondition;
use crate::pipeline::stage::Stage;
use crate::pipeline::types::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Main pipeline structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline name
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,

    /// Environment variables
    #[serde(default)]
    pub environment: Environment,

    /// Stages in pipeline
    pub stages: Vec<Stage>,

    /// Post-conditions for pipeline
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub post: Vec<PostCondition>,
}

impl Validate for Pipeline {
    type Error = ValidationError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.stages.is_empty() {
            return Err(ValidationError::EmptyPipeline);
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            stage.validate()?;
            if !seen.insert(stage.name.as_str()) {
                return Err(ValidationError::DuplicateStage {
                    stage: stage.name.clone(),
                });
            }
        }

        for post in &self.post {
            for step in post.steps() {
                step.validate()?;
            }
        }

        Ok(())
    }
}

impl Pipeline {
    /// Creates a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns pipeline name
    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    /// Returns number of stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Parses and validates a pipeline from YAML
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Parse`] for malformed YAML, or the first
    /// validation failure of the parsed definition.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ValidationError> {
        let pipeline: Self =
            serde_yaml::from_str(yaml).map_err(|e| ValidationError::Parse(e.to_string()))?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Reads, parses and validates a pipeline file
    ///
    /// A pipeline without a name takes the file stem.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be read and
    /// [`PipelineError::Validation`] if it is not a valid pipeline.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let contents = std::fs::read_to_string(path)?;
        let mut pipeline = Self::from_yaml_str(&contents)?;
        if pipeline.name.is_none() {
            pipeline.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string());
        }
        Ok(pipeline)
    }

    /// Serializes the pipeline to YAML
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Parse`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ValidationError> {
        serde_yaml::to_string(self).map_err(|e| ValidationError::Parse(e.to_string()))
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pipeline({}): {} stages",
            self.name.as_deref().unwrap_or("unnamed"),
            self.stages.len()
        )
    }
}

/// Builder for creating pipelines
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    pipeline: Pipeline,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline {
                name: None,
                environment: Environment::new(),
                stages: Vec::new(),
                post: Vec::new(),
            },
        }
    }

    /// Sets pipeline name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.pipeline.name = Some(name.into());
        self
    }

    /// Adds a stage to pipeline
    pub fn stage(mut self, stage: Stage) -> Self {
        self.pipeline.stages.push(stage);
        self
    }

    /// Adds multiple stages to pipeline
    pub fn stages(mut self, mut stages: Vec<Stage>) -> Self {
        self.pipeline.stages.append(&mut stages);
        self
    }

    /// Configures environment with a closure
    pub fn environment<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Environment) -> Environment,
    {
        self.pipeline.environment = f(self.pipeline.environment);
        self
    }

    /// Sets environment directly
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.pipeline.environment = environment;
        self
    }

    /// Adds a post-condition to pipeline
    pub fn post(mut self, condition: PostCondition) -> Self {
        self.pipeline.post.push(condition);
        self
    }

    /// Builds pipeline
    #[allow(clippy::missing_errors_doc)]
    pub fn build(self) -> Result<Pipeline, ValidationError> {
        self.pipeline.validate()?;
        Ok(self.pipeline)
    }

    /// Builds pipeline without validation
    #[must_use]
    pub fn build_unchecked(self) -> Pipeline {
        self.pipeline
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
