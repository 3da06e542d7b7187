//! Pipeline execution layer
//!
//! This module contains the stage runner and the seams it drives: tool
//! invocation, quality gate waiting and artifact publishing.

mod invoker;
mod publisher;
mod quality_gate;
mod runner;
mod traits;

pub use invoker::{
    Invocation, ShellInvoker, ToolInvoker, ToolOutput, collect_outputs, expand_variables,
};
pub use publisher::{
    ArtifactPublisher, ArtifactRepository, DESCRIPTOR_EXTENSION, UploadFile, UploadResult,
};
pub use quality_gate::{
    DEFAULT_GATE_TIMEOUT, DEFAULT_POLL_INTERVAL, GateStatus, GateVerdict, QualityGateService,
    QualityGateWaiter,
};
pub use runner::StageRunner;
pub use traits::{PipelineContext, PipelineExecutor, RunReport, StageReport};
