use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::OperationStatus;
use crate::{PersonGroupId, SnapshotId, SubscriptionId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersonGroupSummary {
    pub person_group_id: PersonGroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub apply_scope: Vec<SubscriptionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
}

/// Training progress of a person group. Same status lifecycle as a
/// long-running operation, polled from the group's training endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrainingReport {
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaceRectangle {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    pub face_id: String,
    pub face_rectangle: FaceRectangle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimilarFace {
    pub face_id: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyCandidate {
    pub person_id: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyResult {
    pub face_id: String,
    #[serde(default)]
    pub candidates: Vec<IdentifyCandidate>,
}

impl IdentifyResult {
    /// Candidates arrive ordered by confidence; the first one is the match.
    pub fn top_candidate(&self) -> Option<&IdentifyCandidate> {
        self.candidates.first()
    }
}
