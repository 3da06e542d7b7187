//! Post-condition types for pipeline execution
//!
//! This module defines actions that execute after pipeline or stage completion,
//! keyed by the outcome.

#![allow(clippy::must_use_candidate)]

use super::steps::Step;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Actions that execute after pipeline or stage completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostCondition {
    /// Always execute regardless of result
    Always {
        /// Steps to execute
        steps: Vec<Step>,
    },

    /// Execute only on success
    Success {
        /// Steps to execute
        steps: Vec<Step>,
    },

    /// Execute only on failure
    Failure {
        /// Steps to execute
        steps: Vec<Step>,
    },

    /// Execute only when unstable
    Unstable {
        /// Steps to execute
        steps: Vec<Step>,
    },
}

impl PostCondition {
    /// Creates an "always" condition
    pub fn always(steps: Vec<Step>) -> Self {
        Self::Always { steps }
    }

    /// Creates a "success" condition
    pub fn success(steps: Vec<Step>) -> Self {
        Self::Success { steps }
    }

    /// Creates a "failure" condition
    pub fn failure(steps: Vec<Step>) -> Self {
        Self::Failure { steps }
    }

    /// Creates an "unstable" condition
    pub fn unstable(steps: Vec<Step>) -> Self {
        Self::Unstable { steps }
    }

    /// Returns the steps for this condition
    pub fn steps(&self) -> &[Step] {
        match self {
            Self::Always { steps }
            | Self::Success { steps }
            | Self::Failure { steps }
            | Self::Unstable { steps } => steps,
        }
    }

    /// Returns true if this condition should execute given the result
    pub fn should_execute(&self, result: super::StageResult) -> bool {
        match self {
            Self::Always { .. } => true,
            Self::Success { .. } => result.is_success(),
            Self::Failure { .. } => result.is_failure(),
            Self::Unstable { .. } => result.is_unstable(),
        }
    }
}

impl fmt::Display for PostCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always { steps } => write!(f, "always({} steps)", steps.len()),
            Self::Success { steps } => write!(f, "success({} steps)", steps.len()),
            Self::Failure { steps } => write!(f, "failure({} steps)", steps.len()),
            Self::Unstable { steps } => write!(f, "unstable({} steps)", steps.len()),
        }
    }
}
