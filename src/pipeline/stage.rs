//! Stage types for pipeline definition
//!
//! This module defines stage types and their builder pattern.

#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

use super::Validate;
use super::errors::ValidationError;
use super::post::PostCondition;
use super::steps::Step;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a stage name
pub const MAX_STAGE_NAME_LEN: usize = 100;

/// A stage in a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage name
    pub name: String,

    /// Steps in this stage, executed in order
    pub steps: Vec<Step>,

    /// Post-conditions for this stage
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub post: Vec<PostCondition>,

    /// A failure marks the stage unstable instead of halting the run
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub best_effort: bool,
}

impl Validate for Stage {
    type Error = ValidationError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if self.name.len() > MAX_STAGE_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                max: MAX_STAGE_NAME_LEN,
                len: self.name.len(),
            });
        }

        if self.steps.is_empty() {
            return Err(ValidationError::EmptyStage {
                stage: self.name.clone(),
            });
        }

        for step in &self.steps {
            step.validate()?;
        }

        for post in &self.post {
            for step in post.steps() {
                step.validate()?;
            }
        }

        Ok(())
    }
}

impl Stage {
    /// Creates a new stage
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
            post: Vec::new(),
            best_effort: false,
        }
    }

    /// Adds a post-condition to this stage
    pub fn with_post(mut self, post: PostCondition) -> Self {
        self.post.push(post);
        self
    }

    /// Marks this stage as best-effort
    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage({}): {} steps", self.name, self.steps.len())
    }
}

/// Builder for creating stages
pub struct StageBuilder {
    stage: Stage,
}

impl StageBuilder {
    /// Creates a new stage builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            stage: Stage::new(name, Vec::new()),
        }
    }

    /// Adds a step to the stage
    pub fn step(mut self, step: Step) -> Self {
        self.stage.steps.push(step);
        self
    }

    /// Adds multiple steps to the stage
    pub fn steps(mut self, mut steps: Vec<Step>) -> Self {
        self.stage.steps.append(&mut steps);
        self
    }

    /// Adds a post-condition to the stage
    pub fn post(mut self, condition: PostCondition) -> Self {
        self.stage.post.push(condition);
        self
    }

    /// Adds several post-conditions to the stage
    pub fn posts(mut self, mut conditions: Vec<PostCondition>) -> Self {
        self.stage.post.append(&mut conditions);
        self
    }

    /// Marks the stage as best-effort
    pub fn best_effort(mut self, best_effort: bool) -> Self {
        self.stage.best_effort = best_effort;
        self
    }

    /// Builds the stage
    #[allow(clippy::missing_errors_doc)]
    pub fn build(self) -> Result<Stage, ValidationError> {
        self.stage.validate()?;
        Ok(self.stage)
    }

    /// Builds the stage without validation
    #[must_use]
    pub fn build_unchecked(self) -> Stage {
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_creation() {
        let stage = Stage::new("Build", vec![Step::shell("mvn install")]);

        assert_eq!(stage.name, "Build");
        assert_eq!(stage.steps.len(), 1);
        assert!(stage.post.is_empty());
        assert!(!stage.best_effort);
    }

    #[test]
    fn test_stage_validation_empty_name() {
        let stage = Stage::new(" ", vec![Step::shell("echo")]);
        assert!(matches!(stage.validate(), Err(ValidationError::EmptyName)));
    }

    #[test]
    fn test_stage_validation_name_too_long() {
        let stage = Stage::new("a".repeat(101), vec![Step::shell("echo")]);
        assert!(matches!(
            stage.validate(),
            Err(ValidationError::NameTooLong { max: 100, len: 101 })
        ));
    }

    #[test]
    fn test_stage_validation_empty_steps() {
        let stage = Stage::new("Build", vec![]);
        assert!(matches!(
            stage.validate(),
            Err(ValidationError::EmptyStage { .. })
        ));
    }

    #[test]
    fn test_stage_validation_checks_post_steps() {
        let stage = Stage::new("Build", vec![Step::shell("mvn install")])
            .with_post(PostCondition::success(vec![Step::archive_artifacts("")]));
        assert!(matches!(
            stage.validate(),
            Err(ValidationError::InvalidStep { .. })
        ));
    }

    #[test]
    fn test_stage_display() {
        let stage = Stage::new("Build", vec![Step::shell("mvn install")]);
        assert_eq!(stage.to_string(), "Stage(Build): 1 steps");
    }

    #[test]
    fn test_stage_builder() {
        let stage = StageBuilder::new("Checkstyle Analysis")
            .step(Step::shell("mvn -s settings.xml checkstyle:checkstyle"))
            .post(PostCondition::always(vec![Step::echo("done")]))
            .best_effort(true)
            .build()
            .unwrap();

        assert_eq!(stage.name, "Checkstyle Analysis");
        assert_eq!(stage.post.len(), 1);
        assert!(stage.best_effort);
    }

    #[test]
    fn test_stage_yaml_best_effort_default() {
        let yaml = r"
name: UNIT TEST
steps:
  - type: shell
    command: mvn -s settings.xml test
";
        let stage: Stage = serde_yaml::from_str(yaml).unwrap();
        assert!(!stage.best_effort);
        assert!(stage.validate().is_ok());
    }
}
