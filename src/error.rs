use thiserror::Error;

use crate::{
    diff::CollectionDiff,
    item::{ItemId, WorkerId},
};

/// Everything that can go wrong while scheduling a session.
///
/// None of these are recoverable at this layer. The host is expected to abort
/// the run and tell every worker to stop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScheduleError {
    #[error("workers disagree on the collected items:\n{}", render_diffs(.diffs))]
    CollectionMismatch { diffs: Vec<CollectionDiff> },

    #[error("worker {worker} collected {item} more than once")]
    DuplicateItem { worker: WorkerId, item: ItemId },

    #[error("could not resolve a scope for item {item}")]
    UnresolvedScope { item: ItemId },

    #[error("worker {worker} reported its collection after all expected workers did")]
    LateReport { worker: WorkerId },

    #[error("worker {worker} reported its collection twice")]
    DuplicateReport { worker: WorkerId },

    #[error("worker {worker} is not part of this session")]
    UnknownWorker { worker: WorkerId },

    #[error("worker {worker} completed {item}, which was not pending on it")]
    UnexpectedCompletion { worker: WorkerId, item: ItemId },

    #[error("worker {worker} went down before all workers finished collecting")]
    WorkerLost { worker: WorkerId },

    #[error("worker {worker} went down and no worker is left for {queued} queued work units")]
    NoWorkersLeft { worker: WorkerId, queued: usize },

    #[error("session has {registered} worker channels but expects {expected} workers")]
    WorkerCountMismatch { expected: usize, registered: usize },

    #[error("completion reported before all workers finished collecting")]
    NotReady,

    #[error("the session was aborted")]
    Aborted,

    #[error("all worker event senders disconnected before the session finished")]
    Disconnected,
}

impl ScheduleError {
    /// The workers whose collections disagreed with the canonical one.
    pub fn mismatched_workers(&self) -> Vec<&WorkerId> {
        match self {
            ScheduleError::CollectionMismatch { diffs } => {
                diffs.iter().map(|diff| &diff.other).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn render_diffs(diffs: &[CollectionDiff]) -> String {
    diffs.iter().map(ToString::to_string).collect()
}
