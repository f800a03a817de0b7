pub mod models;
pub mod operation;
pub mod status;

pub use models::{
    DetectedFace, FaceRectangle, IdentifyCandidate, IdentifyResult, PersonGroupSummary,
    SimilarFace, SnapshotSummary, TrainingReport,
};
pub use operation::OperationReport;
pub use status::{OperationStatus, UnknownStatus};

pub type OperationId = String;
pub type SnapshotId = String;
pub type PersonGroupId = String;
pub type SubscriptionId = String;
