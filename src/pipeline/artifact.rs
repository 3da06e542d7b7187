//! Build artifacts and their repository coordinates

#![allow(clippy::must_use_candidate)]

use super::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A file produced by the build, ready to be published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    /// Location of the primary artifact
    pub path: PathBuf,
    /// Declared packaging type (`war`, `jar`, ...)
    pub packaging: String,
    /// Version string the artifact is published under
    pub version: String,
    /// Project descriptor published alongside the artifact
    pub descriptor: PathBuf,
}

impl BuildArtifact {
    /// Creates an artifact description from explicit paths
    pub fn new(
        path: impl Into<PathBuf>,
        packaging: impl Into<String>,
        version: impl Into<String>,
        descriptor: impl Into<PathBuf>,
    ) -> Self {
        Self {
            path: path.into(),
            packaging: packaging.into(),
            version: version.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Finds the artifact matching `pattern` under `workspace`
    ///
    /// When several files match, the lexicographically first one wins.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ArtifactNotFound`] naming the computed glob
    /// when nothing matches.
    pub fn locate(
        workspace: &Path,
        pattern: &str,
        packaging: impl Into<String>,
        version: impl Into<String>,
        descriptor: &str,
    ) -> Result<Self, PipelineError> {
        let glob_path = workspace.join(pattern);
        let glob_str = glob_path.to_string_lossy().to_string();

        let mut matches = glob::glob(&glob_str)
            .map_err(|e| PipelineError::Config(format!("invalid artifact pattern '{pattern}': {e}")))?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect::<Vec<_>>();
        matches.sort();

        let Some(path) = matches.first().cloned() else {
            return Err(PipelineError::ArtifactNotFound { path: glob_str });
        };

        if matches.len() > 1 {
            tracing::warn!(
                pattern = %glob_str,
                selected = %path.display(),
                candidates = matches.len(),
                "Several artifacts match, publishing the first"
            );
        }

        Ok(Self::new(
            path,
            packaging,
            version,
            workspace.join(descriptor),
        ))
    }

    /// File name of the primary artifact
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Reference to credentials held outside the pipeline definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRef(pub String);

impl CredentialRef {
    /// Creates a credential reference
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Prefix of the environment variables holding this credential
    pub fn env_prefix(&self) -> String {
        self.0.to_uppercase().replace(['-', '.', ' '], "_")
    }

    /// Resolves the credential from `<PREFIX>_USR` and `<PREFIX>_PSW`
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if either variable is missing.
    pub fn resolve(&self, env: &HashMap<String, String>) -> Result<Credentials, PipelineError> {
        let prefix = self.env_prefix();
        let user_var = format!("{prefix}_USR");
        let pass_var = format!("{prefix}_PSW");

        let username = env.get(&user_var).ok_or_else(|| {
            PipelineError::Config(format!("credential '{}' missing {user_var}", self.0))
        })?;
        let password = env.get(&pass_var).ok_or_else(|| {
            PipelineError::Config(format!("credential '{}' missing {pass_var}", self.0))
        })?;

        Ok(Credentials {
            username: username.clone(),
            password: password.clone(),
        })
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved username and password
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password or token
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where an artifact is published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryCoordinates {
    /// Maven group id
    pub group_id: String,
    /// Maven artifact id
    pub artifact_id: String,
    /// Version
    pub version: String,
    /// Target repository name
    pub repository: String,
    /// Credentials used for the upload
    pub credentials: CredentialRef,
}

impl fmt::Display for RepositoryCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}@{}",
            self.group_id, self.artifact_id, self.version, self.repository
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_locate_finds_packaged_file() {
        let workspace = tempfile::tempdir().unwrap();
        fs::create_dir_all(workspace.path().join("target")).unwrap();
        fs::write(workspace.path().join("target/app-1.0-42.war"), b"war").unwrap();

        let artifact =
            BuildArtifact::locate(workspace.path(), "target/*.war", "war", "1.0-42", "pom.xml")
                .unwrap();

        assert_eq!(artifact.file_name(), "app-1.0-42.war");
        assert_eq!(artifact.descriptor, workspace.path().join("pom.xml"));
        assert_eq!(artifact.version, "1.0-42");
    }

    #[test]
    fn test_locate_missing_names_glob() {
        let workspace = tempfile::tempdir().unwrap();

        let err = BuildArtifact::locate(workspace.path(), "target/*.war", "war", "1", "pom.xml")
            .unwrap_err();

        let PipelineError::ArtifactNotFound { path } = err else {
            panic!("unexpected error: {err}");
        };
        assert!(path.ends_with("target/*.war"));
    }

    #[test]
    fn test_locate_picks_first_sorted_match() {
        let workspace = tempfile::tempdir().unwrap();
        let target = workspace.path().join("target");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("b.war"), b"b").unwrap();
        fs::write(target.join("a.war"), b"a").unwrap();

        let artifact =
            BuildArtifact::locate(workspace.path(), "target/*.war", "war", "1", "pom.xml")
                .unwrap();
        assert_eq!(artifact.file_name(), "a.war");
    }

    #[test]
    fn test_credential_resolution() {
        let env = HashMap::from([
            ("NEXUSLOGIN_USR".to_string(), "admin".to_string()),
            ("NEXUSLOGIN_PSW".to_string(), "secret".to_string()),
        ]);

        let creds = CredentialRef::new("nexuslogin").resolve(&env).unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "secret");
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn test_credential_resolution_missing() {
        let err = CredentialRef::new("nexus-login")
            .resolve(&HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("NEXUS_LOGIN_USR"));
    }

    #[test]
    fn test_coordinates_display() {
        let coords = RepositoryCoordinates {
            group_id: "QA".to_string(),
            artifact_id: "vproapp".to_string(),
            version: "1.0-42".to_string(),
            repository: "vprofile-release".to_string(),
            credentials: CredentialRef::new("nexuslogin"),
        };
        assert_eq!(coords.to_string(), "QA:vproapp:1.0-42@vprofile-release");
    }
}
