//! Quality gate waiting
//!
//! After an analysis is submitted, the external service computes a verdict
//! asynchronously. [`QualityGateWaiter`] polls a [`QualityGateService`] until
//! a verdict arrives or a fixed upper bound elapses.

use crate::pipeline::PipelineError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for a quality gate wait
pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(600);

/// Default delay between two polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// State of an analysis submission as seen by one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    /// The verdict is not computed yet
    Pending,
    /// The gate passed
    Passed,
    /// The gate failed
    Failed {
        /// Status reported by the service
        status: String,
    },
}

/// Final outcome of a quality gate wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    /// Quality is acceptable
    Pass,
    /// Quality is not acceptable
    Fail {
        /// Status reported by the service
        status: String,
    },
    /// No verdict before the timeout
    TimedOut,
}

impl GateVerdict {
    /// Converts the verdict into a pipeline outcome
    ///
    /// # Errors
    ///
    /// `Fail` becomes [`PipelineError::QualityGateFailure`] and `TimedOut`
    /// becomes [`PipelineError::QualityGateTimeout`].
    pub fn into_result(self, submission_id: &str, timeout: Duration) -> Result<(), PipelineError> {
        match self {
            Self::Pass => Ok(()),
            Self::Fail { status } => Err(PipelineError::QualityGateFailure {
                submission_id: submission_id.to_string(),
                status,
            }),
            Self::TimedOut => Err(PipelineError::QualityGateTimeout {
                submission_id: submission_id.to_string(),
                timeout,
            }),
        }
    }
}

/// External service computing quality verdicts
#[async_trait]
pub trait QualityGateService: Send + Sync {
    /// Queries the current state of a submission
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] if the service cannot be reached.
    async fn poll(&self, submission_id: &str) -> Result<GateStatus, PipelineError>;
}

/// Blocks a run until the quality verdict is known
#[derive(Clone)]
pub struct QualityGateWaiter {
    service: Arc<dyn QualityGateService>,
    poll_interval: Duration,
}

impl QualityGateWaiter {
    /// Creates a waiter polling at the default interval
    #[must_use]
    pub fn new(service: Arc<dyn QualityGateService>) -> Self {
        Self {
            service,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the delay between polls
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Waits for the verdict on `submission_id`, at most `timeout`
    ///
    /// # Errors
    ///
    /// Propagates service errors. A negative or missing verdict is not an
    /// error here, see [`GateVerdict::into_result`].
    pub async fn wait(
        &self,
        submission_id: &str,
        timeout: Duration,
    ) -> Result<GateVerdict, PipelineError> {
        tracing::info!(
            submission_id,
            timeout_secs = timeout.as_secs(),
            "Waiting for quality gate"
        );

        match tokio::time::timeout(timeout, self.poll_until_resolved(submission_id)).await {
            Ok(verdict) => {
                let verdict = verdict?;
                tracing::info!(submission_id, verdict = ?verdict, "Quality gate resolved");
                Ok(verdict)
            }
            Err(_) => {
                tracing::error!(submission_id, "Quality gate timed out");
                Ok(GateVerdict::TimedOut)
            }
        }
    }

    async fn poll_until_resolved(&self, submission_id: &str) -> Result<GateVerdict, PipelineError> {
        loop {
            match self.service.poll(submission_id).await? {
                GateStatus::Passed => return Ok(GateVerdict::Pass),
                GateStatus::Failed { status } => return Ok(GateVerdict::Fail { status }),
                GateStatus::Pending => {
                    tracing::debug!(submission_id, "Quality gate pending");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for QualityGateWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityGateWaiter")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
