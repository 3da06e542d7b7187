//! Artifact publishing
//!
//! A publish uploads the primary artifact and its descriptor together, in a
//! single repository call, so consumers can always resolve the metadata of
//! what they download.

use crate::pipeline::{BuildArtifact, Credentials, PipelineError, RepositoryCoordinates};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extension of the descriptor asset
pub const DESCRIPTOR_EXTENSION: &str = "pom";

/// One file of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Local path
    pub path: PathBuf,
    /// Repository extension (`war`, `pom`, ...)
    pub extension: String,
}

impl UploadFile {
    /// File name component of the path
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Repository the files went to
    pub repository: String,
    /// `group:artifact:version` of the upload
    pub coordinates: String,
    /// Uploaded file names, primary artifact first
    pub files: Vec<String>,
}

/// Versioned storage for build artifacts
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Uploads all `files` as one component, authenticated as `credentials`
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] or [`PipelineError::Config`] when the
    /// repository rejects the upload or cannot be reached.
    async fn upload(
        &self,
        coordinates: &RepositoryCoordinates,
        credentials: &Credentials,
        files: &[UploadFile],
    ) -> Result<(), PipelineError>;
}

/// Checks preconditions and hands artifacts to the repository
#[derive(Clone)]
pub struct ArtifactPublisher {
    repository: Arc<dyn ArtifactRepository>,
}

impl ArtifactPublisher {
    /// Creates a publisher over `repository`
    #[must_use]
    pub fn new(repository: Arc<dyn ArtifactRepository>) -> Self {
        Self { repository }
    }

    /// Publishes `artifact` with its descriptor under `coordinates`
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ArtifactNotFound`] without uploading anything
    /// if the artifact or its descriptor is missing, and propagates
    /// repository errors.
    pub async fn publish(
        &self,
        artifact: &BuildArtifact,
        coordinates: &RepositoryCoordinates,
        credentials: &Credentials,
    ) -> Result<UploadResult, PipelineError> {
        ensure_file(&artifact.path)?;
        ensure_file(&artifact.descriptor)?;

        let files = vec![
            UploadFile {
                path: artifact.path.clone(),
                extension: artifact.packaging.clone(),
            },
            UploadFile {
                path: artifact.descriptor.clone(),
                extension: DESCRIPTOR_EXTENSION.to_string(),
            },
        ];

        tracing::info!(
            coordinates = %coordinates,
            artifact = %artifact.path.display(),
            "Uploading artifact"
        );
        self.repository.upload(coordinates, credentials, &files).await?;

        Ok(UploadResult {
            repository: coordinates.repository.clone(),
            coordinates: format!(
                "{}:{}:{}",
                coordinates.group_id, coordinates.artifact_id, coordinates.version
            ),
            files: files.iter().map(UploadFile::file_name).collect(),
        })
    }
}

impl std::fmt::Debug for ArtifactPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactPublisher").finish_non_exhaustive()
    }
}

fn ensure_file(path: &Path) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::ArtifactNotFound {
            path: path.display().to_string(),
        })
    }
}
