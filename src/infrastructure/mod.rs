//! Infrastructure layer
//!
//! This module contains configuration, logging, metrics and the adapters to
//! the external analysis and artifact services.

mod config;
mod logging;
mod metrics;
pub mod nexus;
pub mod sonarqube;

pub use config::{Config, NexusConfig, SonarConfig};
pub use logging::{LOG_ENV, init_logging};
pub use metrics::{MetricsCollector, PipelineMetrics};
pub use nexus::NexusClient;
pub use sonarqube::{ReportTask, SonarQubeClient, parse_report_task};
