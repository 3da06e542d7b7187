//! Pipeline domain types and logic

pub mod artifact;
pub mod errors;
pub mod pipeline_def;
pub mod post;
pub mod stage;
pub mod steps;
pub mod types;


pub use serde::{Deserialize, Serialize};

pub use artifact::{BuildArtifact, CredentialRef, Credentials, RepositoryCoordinates};
pub use errors::{ErrorKind, PipelineError, ValidationError};
pub use pipeline_def::{Pipeline, PipelineBuilder};
pub use post::PostCondition;
pub use stage::{Stage, StageBuilder};
pub use steps::{Step, StepType, UploadSpec};
pub use types::{StageResult, Validate};

use std::collections::HashMap;

/// Defines environment variables that can be used in pipeline steps.
///
/// Values may reference other variables with `${VAR}`; references are
/// resolved with [`resolve`][Environment::resolve] or
/// [`resolve_all`][Environment::resolve_all].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Environment {
    /// Environment variables as key-value pairs.
    #[serde(flatten)]
    pub vars: HashMap<String, String>,
}

impl Environment {
    /// Creates a new empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Gets an environment variable by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&String> {
        self.vars.get(key)
    }

    /// Resolves `${VAR}` references in `value` against this environment.
    ///
    /// Unknown references are left untouched.
    #[must_use]
    pub fn resolve(&self, value: &str) -> String {
        crate::executor::expand_variables(value, &self.vars)
    }

    /// Resolves every variable against `base` and merges the result into it.
    ///
    /// References point at `base` only, not at sibling entries, so the
    /// outcome does not depend on map iteration order.
    #[must_use]
    pub fn resolve_all(&self, base: &HashMap<String, String>) -> HashMap<String, String> {
        let mut merged = base.clone();
        for (key, value) in &self.vars {
            merged.insert(key.clone(), crate::executor::expand_variables(value, base));
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_resolve() {
        let env = Environment::new()
            .set("BUILD_ID", "42")
            .set("BUILD_TIMESTAMP", "24-05-01_1200");
        assert_eq!(
            env.resolve("${BUILD_ID}-${BUILD_TIMESTAMP}"),
            "42-24-05-01_1200"
        );
        assert_eq!(env.resolve("${MISSING}"), "${MISSING}");
    }

    #[test]
    fn test_environment_resolve_all_uses_base() {
        let base = HashMap::from([("BUILD_NUMBER".to_string(), "7".to_string())]);
        let env = Environment::new()
            .set("RELEASE_REPO", "vprofile-release")
            .set("TAG", "build-${BUILD_NUMBER}");

        let resolved = env.resolve_all(&base);
        assert_eq!(resolved.get("TAG"), Some(&"build-7".to_string()));
        assert_eq!(
            resolved.get("RELEASE_REPO"),
            Some(&"vprofile-release".to_string())
        );
        assert_eq!(resolved.get("BUILD_NUMBER"), Some(&"7".to_string()));
    }

    #[test]
    fn test_environment_yaml_is_flat_map() {
        let env: Environment = serde_yaml::from_str("NEXUS_LOGIN: nexuslogin\n").unwrap();
        assert_eq!(env.get("NEXUS_LOGIN"), Some(&"nexuslogin".to_string()));
    }
}
