use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use facesync_client::{FaceClientError, FaceOps};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::poll::{wait_for_operation, PollError, PollPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Take,
    Apply,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Take => f.write_str("take"),
            Self::Apply => f.write_str("apply"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{phase} submission rejected: {source}")]
    Submission {
        phase: TransferPhase,
        #[source]
        source: FaceClientError,
    },

    #[error("{phase} produced a malformed response: {context}")]
    MalformedResponse {
        phase: TransferPhase,
        context: String,
    },

    #[error("{phase} operation did not complete: {source}")]
    Poll {
        phase: TransferPhase,
        #[source]
        source: PollError,
    },
}

impl TransferError {
    pub fn phase(&self) -> TransferPhase {
        match self {
            Self::Submission { phase, .. }
            | Self::MalformedResponse { phase, .. }
            | Self::Poll { phase, .. } => *phase,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub person_group_id: String,
    /// Subscription ids that may read the snapshot. Deduplicated before
    /// submission; list source and target freely.
    pub apply_scope: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub snapshot_id: String,
    pub target_person_group_id: String,
    pub take_operation_id: String,
    pub apply_operation_id: String,
}

/// Moves one person group between two independently-authenticated regions via
/// the snapshot mechanism: submit take, await, submit apply under a freshly
/// generated group id, await. Each phase must complete before the next starts
/// and a failure halts the sequence; retry happens only inside the poll loop.
///
/// On success the target group exists under the generated id. It is never
/// deleted here; cleanup is an explicit caller step. On apply failure the
/// target may hold partial state, which is likewise left for the caller.
pub struct SnapshotTransfer {
    source: Arc<dyn FaceOps>,
    target: Arc<dyn FaceOps>,
    policy: PollPolicy,
}

impl SnapshotTransfer {
    pub fn new(source: Arc<dyn FaceOps>, target: Arc<dyn FaceOps>) -> Self {
        Self {
            source,
            target,
            policy: PollPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn run(
        &self,
        request: &TransferRequest,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome, TransferError> {
        let scope = dedupe_scope(&request.apply_scope);

        let take_operation_id = self
            .source
            .take_snapshot(&request.person_group_id, &scope)
            .await
            .map_err(|source| TransferError::Submission {
                phase: TransferPhase::Take,
                source,
            })?;
        info!(
            group = %request.person_group_id,
            operation = %take_operation_id,
            state = "take_submitted",
            "snapshot take submitted"
        );

        let take_report =
            wait_for_operation(self.source.as_ref(), &take_operation_id, self.policy, cancel)
                .await
                .map_err(|source| TransferError::Poll {
                    phase: TransferPhase::Take,
                    source,
                })?;

        let location = take_report.resource_location.as_deref().ok_or_else(|| {
            TransferError::MalformedResponse {
                phase: TransferPhase::Take,
                context: "terminal take report carried no resource location".to_string(),
            }
        })?;
        let snapshot_id = snapshot_id_from_location(location).ok_or_else(|| {
            TransferError::MalformedResponse {
                phase: TransferPhase::Take,
                context: format!("resource location {location:?} does not name a snapshot"),
            }
        })?;
        info!(snapshot = %snapshot_id, state = "take_completed", "snapshot ready");

        // Fresh random id so the applied group cannot collide with anything
        // already present in the target region.
        let target_person_group_id = Uuid::new_v4().to_string();
        let apply_operation_id = self
            .target
            .apply_snapshot(&snapshot_id, &target_person_group_id)
            .await
            .map_err(|source| TransferError::Submission {
                phase: TransferPhase::Apply,
                source,
            })?;
        info!(
            operation = %apply_operation_id,
            group = %target_person_group_id,
            state = "apply_submitted",
            "snapshot apply submitted"
        );

        wait_for_operation(self.target.as_ref(), &apply_operation_id, self.policy, cancel)
            .await
            .map_err(|source| TransferError::Poll {
                phase: TransferPhase::Apply,
                source,
            })?;
        info!(
            group = %target_person_group_id,
            state = "apply_completed",
            "transfer complete"
        );

        Ok(TransferOutcome {
            snapshot_id,
            target_person_group_id,
            take_operation_id,
            apply_operation_id,
        })
    }
}

/// The service rejects apply scopes that name the same subscription twice.
/// First occurrence wins; relative order is preserved.
pub fn dedupe_scope(scope: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    scope
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn snapshot_id_from_location(location: &str) -> Option<String> {
    let (_, id) = location.rsplit_once("/snapshots/")?;
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use facesync_client::InMemoryFaceClient;
    use facesync_contract::{OperationReport, OperationStatus};
    use tokio_util::sync::CancellationToken;

    use super::{
        dedupe_scope, snapshot_id_from_location, SnapshotTransfer, TransferError, TransferPhase,
        TransferRequest,
    };
    use crate::poll::{PollError, PollPolicy};

    fn request() -> TransferRequest {
        TransferRequest {
            person_group_id: "crew".to_string(),
            apply_scope: vec!["sub-source".to_string(), "sub-target".to_string()],
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy::new(Duration::from_secs(10), 10)
    }

    #[tokio::test(start_paused = true)]
    async fn transfers_a_person_group_end_to_end() {
        let source = Arc::new(InMemoryFaceClient::new());
        source.set_take_operation("op-1");
        source.enqueue_operation_status(
            "op-1",
            OperationReport::new("op-1", OperationStatus::Running),
        );
        source.enqueue_operation_status(
            "op-1",
            OperationReport::new("op-1", OperationStatus::Succeeded)
                .with_resource_location("/snapshots/abc-123"),
        );

        let target = Arc::new(InMemoryFaceClient::new());
        target.set_apply_operation("op-2");
        target.enqueue_operation_status(
            "op-2",
            OperationReport::new("op-2", OperationStatus::Succeeded),
        );

        let transfer = SnapshotTransfer::new(source.clone(), target.clone())
            .with_policy(fast_policy());
        let outcome = transfer
            .run(&request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.snapshot_id, "abc-123");
        assert_eq!(outcome.take_operation_id, "op-1");
        assert_eq!(outcome.apply_operation_id, "op-2");
        assert!(!outcome.target_person_group_id.is_empty());
        assert_ne!(outcome.target_person_group_id, "crew");

        let applies = target.recorded_applies();
        assert_eq!(
            applies,
            vec![("abc-123".to_string(), outcome.target_person_group_id.clone())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_scope_entries_are_submitted_once() {
        let source = Arc::new(InMemoryFaceClient::new());
        source.set_take_operation("op-1");
        source.enqueue_operation_status(
            "op-1",
            OperationReport::new("op-1", OperationStatus::Succeeded)
                .with_resource_location("/snapshots/abc-123"),
        );
        let target = Arc::new(InMemoryFaceClient::new());
        target.set_apply_operation("op-2");
        target.enqueue_operation_status(
            "op-2",
            OperationReport::new("op-2", OperationStatus::Succeeded),
        );

        let transfer = SnapshotTransfer::new(source.clone(), target).with_policy(fast_policy());
        let request = TransferRequest {
            person_group_id: "crew".to_string(),
            apply_scope: vec![
                "sub-a".to_string(),
                "sub-b".to_string(),
                "sub-a".to_string(),
            ],
        };
        transfer.run(&request, &CancellationToken::new()).await.unwrap();

        let takes = source.recorded_takes();
        assert_eq!(takes.len(), 1);
        assert_eq!(takes[0].0, "crew");
        assert_eq!(takes[0].1, vec!["sub-a".to_string(), "sub-b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn take_without_operation_location_fails_before_any_poll() {
        let source = Arc::new(InMemoryFaceClient::new());
        let target = Arc::new(InMemoryFaceClient::new());

        let transfer = SnapshotTransfer::new(source.clone(), target.clone())
            .with_policy(fast_policy());
        let err = transfer
            .run(&request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransferError::Submission {
                phase: TransferPhase::Take,
                ..
            }
        ));
        assert_eq!(source.operation_status_calls(), 0);
        assert!(target.recorded_applies().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn succeeded_take_without_resource_location_is_malformed() {
        let source = Arc::new(InMemoryFaceClient::new());
        source.set_take_operation("op-1");
        source.enqueue_operation_status(
            "op-1",
            OperationReport::new("op-1", OperationStatus::Succeeded),
        );
        let target = Arc::new(InMemoryFaceClient::new());

        let transfer = SnapshotTransfer::new(source, target.clone()).with_policy(fast_policy());
        let err = transfer
            .run(&request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransferError::MalformedResponse {
                phase: TransferPhase::Take,
                ..
            }
        ));
        assert!(target.recorded_applies().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_take_halts_the_sequence_with_phase_and_reason() {
        let source = Arc::new(InMemoryFaceClient::new());
        source.set_take_operation("op-1");
        source.enqueue_operation_status(
            "op-1",
            OperationReport::new("op-1", OperationStatus::Failed)
                .with_message("snapshot quota exhausted"),
        );
        let target = Arc::new(InMemoryFaceClient::new());

        let transfer = SnapshotTransfer::new(source, target.clone()).with_policy(fast_policy());
        let err = transfer
            .run(&request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.phase(), TransferPhase::Take);
        match err {
            TransferError::Poll {
                source: PollError::OperationFailed { message, .. },
                ..
            } => assert_eq!(message, "snapshot quota exhausted"),
            other => panic!("expected failed poll, got {other:?}"),
        }
        assert!(target.recorded_applies().is_empty());
    }

    #[test]
    fn dedupe_keeps_first_occurrence_of_each_id() {
        let scope = vec![
            "sub-b".to_string(),
            "sub-a".to_string(),
            "sub-b".to_string(),
            "sub-a".to_string(),
        ];
        assert_eq!(
            dedupe_scope(&scope),
            vec!["sub-b".to_string(), "sub-a".to_string()]
        );
    }

    #[test]
    fn snapshot_id_parsing_accepts_paths_and_urls() {
        assert_eq!(
            snapshot_id_from_location("/snapshots/abc-123").as_deref(),
            Some("abc-123")
        );
        assert_eq!(
            snapshot_id_from_location("https://westus2.api.example.com/snapshots/abc").as_deref(),
            Some("abc")
        );
        assert_eq!(snapshot_id_from_location("/snapshots/"), None);
        assert_eq!(snapshot_id_from_location("/operations/op-1"), None);
        assert_eq!(snapshot_id_from_location("/snapshots/a/b"), None);
    }
}
