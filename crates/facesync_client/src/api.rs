use async_trait::async_trait;
use facesync_contract::{
    DetectedFace, IdentifyResult, OperationReport, PersonGroupSummary, SimilarFace,
    SnapshotSummary, TrainingReport,
};

use crate::error::FaceClientError;

/// Remote capability surface of one regional face service. Every method is a
/// single request/response exchange; the long-running snapshot and training
/// calls hand back an identifier to poll rather than blocking.
#[async_trait]
pub trait FaceOps: Send + Sync {
    async fn list_person_groups(&self) -> Result<Vec<PersonGroupSummary>, FaceClientError>;

    /// Person group ids must be unique within the owning region at creation
    /// time; the service rejects duplicates.
    async fn create_person_group(
        &self,
        group_id: &str,
        name: &str,
    ) -> Result<(), FaceClientError>;

    async fn delete_person_group(&self, group_id: &str) -> Result<(), FaceClientError>;

    async fn create_person(
        &self,
        group_id: &str,
        name: &str,
    ) -> Result<String, FaceClientError>;

    async fn add_person_face(
        &self,
        group_id: &str,
        person_id: &str,
        image_url: &str,
    ) -> Result<String, FaceClientError>;

    async fn train_person_group(&self, group_id: &str) -> Result<(), FaceClientError>;

    async fn training_status(&self, group_id: &str) -> Result<TrainingReport, FaceClientError>;

    /// Submit a snapshot take of the named group, readable by every
    /// subscription in `apply_scope`. The scope must already be free of
    /// duplicates; the service rejects repeated entries.
    async fn take_snapshot(
        &self,
        group_id: &str,
        apply_scope: &[String],
    ) -> Result<String, FaceClientError>;

    /// Submit a snapshot apply that materializes `snapshot_id` under a fresh
    /// group id in this client's region.
    async fn apply_snapshot(
        &self,
        snapshot_id: &str,
        new_group_id: &str,
    ) -> Result<String, FaceClientError>;

    async fn operation_status(
        &self,
        operation_id: &str,
    ) -> Result<OperationReport, FaceClientError>;

    async fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>, FaceClientError>;

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), FaceClientError>;

    async fn detect_faces(&self, image_url: &str) -> Result<Vec<DetectedFace>, FaceClientError>;

    async fn find_similar(
        &self,
        face_id: &str,
        candidates: &[String],
    ) -> Result<Vec<SimilarFace>, FaceClientError>;

    async fn identify(
        &self,
        face_ids: &[String],
        group_id: &str,
    ) -> Result<Vec<IdentifyResult>, FaceClientError>;
}
