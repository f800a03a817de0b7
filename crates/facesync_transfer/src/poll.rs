use std::time::Duration;

use facesync_client::{FaceClientError, FaceOps};
use facesync_contract::{OperationReport, OperationStatus, TrainingReport};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Pacing and bounds for one polling loop. The interval matches the original
/// service guidance of re-checking every 10 seconds; the attempt cap turns a
/// stuck remote operation into a `Timeout` instead of an endless wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 90,
        }
    }
}

/// `subject` is the operation id, or the person group id for training waits.
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Client(#[from] FaceClientError),

    /// Terminal `Failed` status raises rather than returning the report:
    /// callers extract the resource location on the success path, and a
    /// silently returned failure would send them after a resource that was
    /// never produced.
    #[error("operation {operation_id} failed: {message}")]
    OperationFailed {
        operation_id: String,
        message: String,
    },

    #[error("training of person group {group_id} failed: {message}")]
    TrainingFailed { group_id: String, message: String },

    #[error("{subject} did not reach a terminal state after {attempts} polls over {waited:?}")]
    Timeout {
        subject: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("wait for {subject} was cancelled")]
    Cancelled { subject: String },
}

const NO_MESSAGE: &str = "no failure message reported";

/// Poll `operation_id` until it reaches a terminal state and return the final
/// report. Non-terminal statuses re-poll after one interval; the original
/// request is never resubmitted. Waits suspend the task and race `cancel`.
pub async fn wait_for_operation(
    client: &dyn FaceOps,
    operation_id: &str,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<OperationReport, PollError> {
    let started = tokio::time::Instant::now();
    for attempt in 1..=policy.max_attempts {
        let report = client.operation_status(operation_id).await?;
        debug!(operation_id, status = %report.status, attempt, "operation status");
        match report.status {
            OperationStatus::Succeeded => return Ok(report),
            OperationStatus::Failed => {
                let message = report.message.unwrap_or_else(|| NO_MESSAGE.to_string());
                return Err(PollError::OperationFailed {
                    operation_id: operation_id.to_string(),
                    message,
                });
            }
            OperationStatus::NotStarted | OperationStatus::Running => {
                if attempt == policy.max_attempts {
                    break;
                }
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(PollError::Cancelled {
                            subject: operation_id.to_string(),
                        });
                    }
                    _ = tokio::time::sleep(policy.interval) => {}
                }
            }
        }
    }
    Err(PollError::Timeout {
        subject: operation_id.to_string(),
        attempts: policy.max_attempts,
        waited: started.elapsed(),
    })
}

/// Poll a person group's training run until it finishes. Same loop shape as
/// [`wait_for_operation`]; training reports come from a different endpoint
/// and carry no resource location.
pub async fn wait_for_training(
    client: &dyn FaceOps,
    group_id: &str,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> Result<TrainingReport, PollError> {
    let started = tokio::time::Instant::now();
    for attempt in 1..=policy.max_attempts {
        let report = client.training_status(group_id).await?;
        debug!(group_id, status = %report.status, attempt, "training status");
        match report.status {
            OperationStatus::Succeeded => return Ok(report),
            OperationStatus::Failed => {
                let message = report.message.unwrap_or_else(|| NO_MESSAGE.to_string());
                return Err(PollError::TrainingFailed {
                    group_id: group_id.to_string(),
                    message,
                });
            }
            OperationStatus::NotStarted | OperationStatus::Running => {
                if attempt == policy.max_attempts {
                    break;
                }
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(PollError::Cancelled {
                            subject: group_id.to_string(),
                        });
                    }
                    _ = tokio::time::sleep(policy.interval) => {}
                }
            }
        }
    }
    Err(PollError::Timeout {
        subject: group_id.to_string(),
        attempts: policy.max_attempts,
        waited: started.elapsed(),
    })
}
