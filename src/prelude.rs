//! Prelude module for common imports

// Re-export macros
pub use crate::{
    archive, echo, nexus_upload, pipeline, post, quality_gate, sh, sonar_scan, stage, steps,
};

// Re-export all pipeline types with full paths
pub use crate::pipeline::artifact::{BuildArtifact, CredentialRef, RepositoryCoordinates};
pub use crate::pipeline::errors::{PipelineError, ValidationError};
pub use crate::pipeline::pipeline_def::{Pipeline, PipelineBuilder};
pub use crate::pipeline::post::PostCondition;
pub use crate::pipeline::stage::{Stage, StageBuilder};
pub use crate::pipeline::steps::{Step, StepType, UploadSpec};
pub use crate::pipeline::types::{StageResult, Validate};
pub use crate::pipeline::Environment;

// Re-export executor types
pub use crate::executor::{PipelineContext, PipelineExecutor, RunReport, StageRunner};
