pub mod migrate;
pub mod poll;
pub mod purge;

pub use migrate::{
    dedupe_scope, SnapshotTransfer, TransferError, TransferOutcome, TransferPhase,
    TransferRequest,
};
pub use poll::{wait_for_operation, wait_for_training, PollError, PollPolicy};
pub use purge::{purge_person_groups, PurgeReport};
