//! Nexus repository integration
//!
//! Uploads go through the components API in `maven2` format. The artifact
//! and its POM are sent as numbered assets of one multipart request, and
//! Nexus is told not to generate a POM of its own.

use super::config::NexusConfig;
use super::sonarqube::base_url;
use crate::executor::{ArtifactRepository, UploadFile};
use crate::pipeline::{Credentials, PipelineError, RepositoryCoordinates};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

/// Artifact repository backed by Nexus 3
#[derive(Clone)]
pub struct NexusClient {
    client: reqwest::Client,
    base_url: Url,
}

impl NexusClient {
    /// Creates a client for the configured server
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the server address does not parse.
    pub fn new(config: &NexusConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url(&config.base_url())?,
        })
    }

    /// Upload endpoint for `repository`
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the endpoint cannot be built.
    pub fn components_url(&self, repository: &str) -> Result<Url, PipelineError> {
        let mut url = self
            .base_url
            .join("service/rest/v1/components")
            .map_err(|e| PipelineError::Config(format!("invalid Nexus endpoint: {e}")))?;
        url.query_pairs_mut().append_pair("repository", repository);
        Ok(url)
    }
}

/// Text fields of a `maven2` component upload
pub fn form_fields(
    coordinates: &RepositoryCoordinates,
    files: &[UploadFile],
) -> Vec<(String, String)> {
    let mut fields = vec![
        ("maven2.groupId".to_string(), coordinates.group_id.clone()),
        (
            "maven2.artifactId".to_string(),
            coordinates.artifact_id.clone(),
        ),
        ("maven2.version".to_string(), coordinates.version.clone()),
        ("maven2.generate-pom".to_string(), "false".to_string()),
    ];
    for (index, file) in files.iter().enumerate() {
        fields.push((
            format!("maven2.asset{}.extension", index + 1),
            file.extension.clone(),
        ));
    }
    fields
}

async fn build_form(
    coordinates: &RepositoryCoordinates,
    files: &[UploadFile],
) -> Result<Form, PipelineError> {
    let mut form = Form::new();
    for (name, value) in form_fields(coordinates, files) {
        form = form.text(name, value);
    }
    for (index, file) in files.iter().enumerate() {
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| PipelineError::Io(format!("cannot read {}: {e}", file.path.display())))?;
        let part = Part::bytes(bytes).file_name(file.file_name());
        form = form.part(format!("maven2.asset{}", index + 1), part);
    }
    Ok(form)
}

#[async_trait]
impl ArtifactRepository for NexusClient {
    async fn upload(
        &self,
        coordinates: &RepositoryCoordinates,
        credentials: &Credentials,
        files: &[UploadFile],
    ) -> Result<(), PipelineError> {
        let url = self.components_url(&coordinates.repository)?;
        let form = build_form(coordinates, files).await?;

        tracing::debug!(url = %url, files = files.len(), "Posting component");
        let response = self
            .client
            .post(url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Http(format!(
                "upload of {coordinates} rejected with {status}: {body}"
            )));
        }

        tracing::info!(coordinates = %coordinates, status = %status, "Component uploaded");
        Ok(())
    }
}

impl std::fmt::Debug for NexusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NexusClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CredentialRef;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use std::fs;

    const COMPONENTS: &str = "/service/rest/v1/components";

    fn coordinates() -> RepositoryCoordinates {
        RepositoryCoordinates {
            group_id: "QA".to_string(),
            artifact_id: "vproapp".to_string(),
            version: "42-2024-05-01_12-00".to_string(),
            repository: "vprofile-release".to_string(),
            credentials: CredentialRef::new("nexuslogin"),
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "admin".to_string(),
            password: "s3cret".to_string(),
        }
    }

    fn config_for(url: &str) -> NexusConfig {
        let parsed = Url::parse(url).unwrap();
        NexusConfig {
            protocol: parsed.scheme().to_string(),
            host: parsed.host_str().unwrap().to_string(),
            port: parsed.port().unwrap(),
            ..NexusConfig::default()
        }
    }

    fn upload_files(dir: &std::path::Path) -> Vec<UploadFile> {
        fs::write(dir.join("app-1.0.war"), b"war-bytes").unwrap();
        fs::write(dir.join("pom.xml"), b"<project/>").unwrap();
        vec![
            UploadFile {
                path: dir.join("app-1.0.war"),
                extension: "war".to_string(),
            },
            UploadFile {
                path: dir.join("pom.xml"),
                extension: "pom".to_string(),
            },
        ]
    }

    fn body_contains(fragment: &str) -> Matcher {
        Matcher::Regex(regex::escape(fragment))
    }

    #[test]
    fn test_components_url() {
        let client = NexusClient::new(&NexusConfig {
            host: "nexus.internal".to_string(),
            ..NexusConfig::default()
        })
        .unwrap();

        assert_eq!(
            client.components_url("vprofile-release").unwrap().as_str(),
            "http://nexus.internal:8081/service/rest/v1/components?repository=vprofile-release"
        );
    }

    #[test]
    fn test_form_fields() {
        let files = vec![
            UploadFile {
                path: "target/app.war".into(),
                extension: "war".to_string(),
            },
            UploadFile {
                path: "pom.xml".into(),
                extension: "pom".to_string(),
            },
        ];

        let fields = form_fields(&coordinates(), &files);
        let get = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("maven2.groupId"), Some("QA"));
        assert_eq!(get("maven2.artifactId"), Some("vproapp"));
        assert_eq!(get("maven2.version"), Some("42-2024-05-01_12-00"));
        assert_eq!(get("maven2.generate-pom"), Some("false"));
        assert_eq!(get("maven2.asset1.extension"), Some("war"));
        assert_eq!(get("maven2.asset2.extension"), Some("pom"));
    }

    #[tokio::test]
    async fn test_upload_posts_single_multipart_request() {
        let dir = tempfile::tempdir().unwrap();
        let files = upload_files(dir.path());
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", COMPONENTS)
            .match_query(Matcher::UrlEncoded(
                "repository".to_string(),
                "vprofile-release".to_string(),
            ))
            // admin:s3cret
            .match_header("authorization", "Basic YWRtaW46czNjcmV0")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                body_contains(r#"name="maven2.asset1"; filename="app-1.0.war""#),
                body_contains(r#"name="maven2.asset2"; filename="pom.xml""#),
                body_contains("war-bytes"),
            ]))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let client = NexusClient::new(&config_for(&server.url())).unwrap();
        client
            .upload(&coordinates(), &credentials(), &files)
            .await
            .unwrap();

        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let files = upload_files(dir.path());
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", COMPONENTS)
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body("Repository does not allow updating assets")
            .create_async()
            .await;

        let client = NexusClient::new(&config_for(&server.url())).unwrap();
        let err = client
            .upload(&coordinates(), &credentials(), &files)
            .await
            .unwrap_err();

        match err {
            PipelineError::Http(message) => {
                assert!(message.contains("400"));
                assert!(message.contains("does not allow updating"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_unreadable_file_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![UploadFile {
            path: dir.path().join("missing.war"),
            extension: "war".to_string(),
        }];
        let mut server = mockito::Server::new_async().await;
        let upload = server
            .mock("POST", COMPONENTS)
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = NexusClient::new(&config_for(&server.url())).unwrap();
        let err = client
            .upload(&coordinates(), &credentials(), &files)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Io(_)));
        upload.assert_async().await;
    }
}
