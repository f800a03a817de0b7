use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use facesync_contract::{
    DetectedFace, IdentifyResult, OperationReport, PersonGroupSummary, SimilarFace,
    SnapshotSummary, TrainingReport,
};

use crate::api::FaceOps;
use crate::error::FaceClientError;

/// In-memory [`FaceOps`] implementation. Holds scripted status sequences and
/// records every mutating call, which makes it the workhorse for orchestration
/// tests and offline runs. Unconfigured submits behave like a service that
/// omits the `Operation-Location` header.
#[derive(Debug, Default)]
pub struct InMemoryFaceClient {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    groups: Vec<PersonGroupSummary>,
    snapshots: Vec<SnapshotSummary>,
    operations: HashMap<String, VecDeque<OperationReport>>,
    training: HashMap<String, VecDeque<TrainingReport>>,
    take_operation: Option<String>,
    apply_operation: Option<String>,
    detections: HashMap<String, Vec<DetectedFace>>,
    similar: Vec<SimilarFace>,
    identifications: Vec<IdentifyResult>,
    person_seq: u32,
    face_seq: u32,
    takes: Vec<(String, Vec<String>)>,
    applies: Vec<(String, String)>,
    deleted_groups: Vec<String>,
    status_calls: Vec<String>,
    list_calls: u32,
}

impl InMemoryFaceClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_group(&self, group_id: &str, name: &str) {
        self.state().groups.push(PersonGroupSummary {
            person_group_id: group_id.to_string(),
            name: name.to_string(),
            user_data: None,
        });
    }

    pub fn add_snapshot(&self, snapshot: SnapshotSummary) {
        self.state().snapshots.push(snapshot);
    }

    pub fn set_take_operation(&self, operation_id: &str) {
        self.state().take_operation = Some(operation_id.to_string());
    }

    pub fn set_apply_operation(&self, operation_id: &str) {
        self.state().apply_operation = Some(operation_id.to_string());
    }

    /// Queue the next report for an operation. The final queued report
    /// repeats forever, the way a terminal status would on the wire.
    pub fn enqueue_operation_status(&self, operation_id: &str, report: OperationReport) {
        self.state()
            .operations
            .entry(operation_id.to_string())
            .or_default()
            .push_back(report);
    }

    pub fn enqueue_training_status(&self, group_id: &str, report: TrainingReport) {
        self.state()
            .training
            .entry(group_id.to_string())
            .or_default()
            .push_back(report);
    }

    pub fn add_detection(&self, image_url: &str, faces: Vec<DetectedFace>) {
        self.state().detections.insert(image_url.to_string(), faces);
    }

    pub fn set_similar(&self, matches: Vec<SimilarFace>) {
        self.state().similar = matches;
    }

    pub fn set_identifications(&self, results: Vec<IdentifyResult>) {
        self.state().identifications = results;
    }

    pub fn recorded_takes(&self) -> Vec<(String, Vec<String>)> {
        self.state().takes.clone()
    }

    pub fn recorded_applies(&self) -> Vec<(String, String)> {
        self.state().applies.clone()
    }

    pub fn deleted_groups(&self) -> Vec<String> {
        self.state().deleted_groups.clone()
    }

    pub fn operation_status_calls(&self) -> usize {
        self.state().status_calls.len()
    }

    pub fn list_calls(&self) -> u32 {
        self.state().list_calls
    }
}

#[async_trait]
impl FaceOps for InMemoryFaceClient {
    async fn list_person_groups(&self) -> Result<Vec<PersonGroupSummary>, FaceClientError> {
        let mut state = self.state();
        state.list_calls += 1;
        Ok(state.groups.clone())
    }

    async fn create_person_group(
        &self,
        group_id: &str,
        name: &str,
    ) -> Result<(), FaceClientError> {
        let mut state = self.state();
        if state.groups.iter().any(|g| g.person_group_id == group_id) {
            return Err(FaceClientError::Service {
                status: 409,
                code: "PersonGroupExists".to_string(),
                message: format!("person group {group_id} already exists"),
            });
        }
        state.groups.push(PersonGroupSummary {
            person_group_id: group_id.to_string(),
            name: name.to_string(),
            user_data: None,
        });
        Ok(())
    }

    async fn delete_person_group(&self, group_id: &str) -> Result<(), FaceClientError> {
        let mut state = self.state();
        let before = state.groups.len();
        state.groups.retain(|g| g.person_group_id != group_id);
        if state.groups.len() == before {
            return Err(FaceClientError::NotFound {
                resource: format!("persongroups/{group_id}"),
            });
        }
        state.deleted_groups.push(group_id.to_string());
        Ok(())
    }

    async fn create_person(
        &self,
        _group_id: &str,
        _name: &str,
    ) -> Result<String, FaceClientError> {
        let mut state = self.state();
        state.person_seq += 1;
        Ok(format!("person-{}", state.person_seq))
    }

    async fn add_person_face(
        &self,
        _group_id: &str,
        _person_id: &str,
        _image_url: &str,
    ) -> Result<String, FaceClientError> {
        let mut state = self.state();
        state.face_seq += 1;
        Ok(format!("face-{}", state.face_seq))
    }

    async fn train_person_group(&self, _group_id: &str) -> Result<(), FaceClientError> {
        Ok(())
    }

    async fn training_status(&self, group_id: &str) -> Result<TrainingReport, FaceClientError> {
        let mut state = self.state();
        let queue = state
            .training
            .get_mut(group_id)
            .ok_or_else(|| FaceClientError::NotFound {
                resource: format!("persongroups/{group_id}/training"),
            })?;
        let report = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        report.ok_or_else(|| FaceClientError::NotFound {
            resource: format!("persongroups/{group_id}/training"),
        })
    }

    async fn take_snapshot(
        &self,
        group_id: &str,
        apply_scope: &[String],
    ) -> Result<String, FaceClientError> {
        let mut state = self.state();
        state
            .takes
            .push((group_id.to_string(), apply_scope.to_vec()));
        state
            .take_operation
            .clone()
            .ok_or(FaceClientError::MissingOperationLocation)
    }

    async fn apply_snapshot(
        &self,
        snapshot_id: &str,
        new_group_id: &str,
    ) -> Result<String, FaceClientError> {
        let mut state = self.state();
        state
            .applies
            .push((snapshot_id.to_string(), new_group_id.to_string()));
        state
            .apply_operation
            .clone()
            .ok_or(FaceClientError::MissingOperationLocation)
    }

    async fn operation_status(
        &self,
        operation_id: &str,
    ) -> Result<OperationReport, FaceClientError> {
        let mut state = self.state();
        state.status_calls.push(operation_id.to_string());
        let queue = state
            .operations
            .get_mut(operation_id)
            .ok_or_else(|| FaceClientError::NotFound {
                resource: format!("operations/{operation_id}"),
            })?;
        let report = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        report.ok_or_else(|| FaceClientError::NotFound {
            resource: format!("operations/{operation_id}"),
        })
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>, FaceClientError> {
        Ok(self.state().snapshots.clone())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), FaceClientError> {
        let mut state = self.state();
        let before = state.snapshots.len();
        state.snapshots.retain(|s| s.id != snapshot_id);
        if state.snapshots.len() == before {
            return Err(FaceClientError::NotFound {
                resource: format!("snapshots/{snapshot_id}"),
            });
        }
        Ok(())
    }

    async fn detect_faces(&self, image_url: &str) -> Result<Vec<DetectedFace>, FaceClientError> {
        Ok(self
            .state()
            .detections
            .get(image_url)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_similar(
        &self,
        _face_id: &str,
        _candidates: &[String],
    ) -> Result<Vec<SimilarFace>, FaceClientError> {
        Ok(self.state().similar.clone())
    }

    async fn identify(
        &self,
        _face_ids: &[String],
        _group_id: &str,
    ) -> Result<Vec<IdentifyResult>, FaceClientError> {
        Ok(self.state().identifications.clone())
    }
}
