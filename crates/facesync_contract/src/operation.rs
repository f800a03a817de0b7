use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::OperationStatus;
use crate::OperationId;

/// Point-in-time view of a long-running remote operation, as returned by the
/// operation-status endpoint. `resource_location` is populated once the
/// operation succeeds and names the resource it produced (e.g.
/// `/snapshots/{id}` for a snapshot take); `message` carries the failure
/// reason when the status is `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationReport {
    pub operation_id: OperationId,
    pub status: OperationStatus,
    pub resource_location: Option<String>,
    pub message: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub last_action_time: Option<DateTime<Utc>>,
}

impl OperationReport {
    pub fn new(operation_id: impl Into<OperationId>, status: OperationStatus) -> Self {
        Self {
            operation_id: operation_id.into(),
            status,
            resource_location: None,
            message: None,
            created_time: None,
            last_action_time: None,
        }
    }

    pub fn with_resource_location(mut self, location: impl Into<String>) -> Self {
        self.resource_location = Some(location.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
