//! # stagegate - stage execution for CI pipelines
//!
//! stagegate runs a declarative pipeline of ordered stages against external
//! build, analysis and artifact tools. Each stage runs its steps in order,
//! fires post actions keyed by its outcome and halts the run on failure.
//! A quality gate blocks the run until the analysis service returns a
//! verdict, and publishing uploads the build artifact together with its
//! descriptor.
//!
//! ## Quick Start
//!
//! ```rust
//! use stagegate::prelude::*;
//!
//! let pipeline = pipeline!("vprofile", stages {
//!     stage!("Build", steps!(sh!("mvn -DskipTests install"))),
//!     stage!("CODE ANALYSIS", steps!(
//!         sonar_scan!("sonar-scanner -Dsonar.projectKey=vprofile"),
//!         quality_gate!(600),
//!     )),
//!     stage!("UPLOAD ARTIFACT", steps!(
//!         nexus_upload!("QA", "vproapp", "${BUILD_ID}-${BUILD_TIMESTAMP}", "war"),
//!     )),
//! });
//! assert!(pipeline.validate().is_ok());
//! ```
//!
//! ## Features
//!
//! - **Ordered stages**: failures halt the run, later stages are skipped
//! - **Post actions**: `always`, `success`, `failure` and `unstable` hooks
//! - **Quality gates**: bounded waits on SonarQube verdicts
//! - **Publishing**: artifact and POM uploaded to Nexus in one request

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod macros;

pub mod executor;
pub mod infrastructure;
pub mod pipeline;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use executor::{
    ArtifactPublisher, ArtifactRepository, GateStatus, GateVerdict, Invocation, PipelineContext,
    PipelineExecutor, QualityGateService, QualityGateWaiter, RunReport, ShellInvoker, StageReport,
    StageRunner, ToolInvoker, ToolOutput, UploadFile, UploadResult, expand_variables,
};
pub use infrastructure::{
    Config, MetricsCollector, NexusClient, PipelineMetrics, SonarQubeClient,
};
pub use pipeline::{
    BuildArtifact, CredentialRef, Environment, ErrorKind, Pipeline, PipelineBuilder,
    PipelineError, PostCondition, RepositoryCoordinates, Stage, StageBuilder, StageResult, Step,
    StepType, UploadSpec, Validate, ValidationError,
};

/// Version of the stagegate crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
