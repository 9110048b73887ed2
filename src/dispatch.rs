//! Handing work units to workers.
//!
//! The dispatcher owns the queue of unassigned [`WorkUnit`]s and one
//! [`WorkerRecord`] per worker. It never talks to a worker itself, it returns
//! [`Action`]s and leaves delivering them to the host.
//!
//! Work is handed out in whole units. All items of a unit count against the
//! pending count of the same worker at once. A worker gets another unit when
//! its pending count is at or below the low watermark, checked once at start
//! and once after each completed item. When the queue runs dry every worker is
//! told to shut down after its pending items.

use std::{collections::VecDeque, num::NonZeroUsize};

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::{
    error::ScheduleError,
    item::{ItemId, WorkerId},
    partition::WorkUnit,
};

/// A work unit handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub worker: WorkerId,
    pub scope: Box<str>,
    pub items: Vec<ItemId>,
}

/// Something the host has to tell a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run these items.
    Assign(Assignment),
    /// No more work is coming, shut down once pending items are done.
    Shutdown(WorkerId),
}

impl Action {
    pub fn worker(&self) -> &WorkerId {
        match self {
            Action::Assign(assignment) => &assignment.worker,
            Action::Shutdown(worker) => worker,
        }
    }
}

/// Dispatch state of a single worker.
#[derive(Debug)]
pub struct WorkerRecord {
    id: WorkerId,
    pending: IndexSet<ItemId>,
    units: Vec<Box<str>>,
    completed: usize,
    shutting_down: bool,
}

impl WorkerRecord {
    fn new(id: WorkerId) -> Self {
        Self {
            id,
            pending: IndexSet::new(),
            units: Vec::new(),
            completed: 0,
            shutting_down: false,
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Items assigned to this worker that did not complete yet, in assignment order.
    pub fn pending(&self) -> impl ExactSizeIterator<Item = &ItemId> {
        self.pending.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Scope keys of the units assigned to this worker, in assignment order.
    pub fn units(&self) -> &[Box<str>] {
        &self.units
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    low_watermark: NonZeroUsize,
    queue: VecDeque<WorkUnit>,
    workers: IndexMap<WorkerId, WorkerRecord>,
}

impl Dispatcher {
    /// Create a dispatcher for `units` and `workers`.
    ///
    /// Units are handed out in the given order, workers are served in the
    /// given order during the initial distribution.
    pub fn new(
        units: impl IntoIterator<Item = WorkUnit>,
        workers: impl IntoIterator<Item = WorkerId>,
        low_watermark: NonZeroUsize,
    ) -> Self {
        Self {
            low_watermark,
            queue: units.into_iter().collect(),
            workers: workers
                .into_iter()
                .map(|id| (id.clone(), WorkerRecord::new(id)))
                .collect(),
        }
    }

    /// Perform the initial distribution.
    ///
    /// Workers beyond the number of units are shut down right away. The
    /// others get one unit each round-robin, then one refill pass so that
    /// workers still at or below the watermark start with a second unit.
    pub fn start(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        let surplus = self.workers.len().saturating_sub(self.queue.len());
        let active = self.workers.len() - surplus;
        for record in self.workers.values_mut().skip(active) {
            record.shutting_down = true;
            actions.push(Action::Shutdown(record.id.clone()));
        }
        if surplus > 0 {
            debug!(surplus, "more workers than work units");
        }

        let active: Vec<WorkerId> = self.workers.keys().take(active).cloned().collect();
        actions.extend(active.iter().filter_map(|worker| self.assign_unit(worker)));
        actions.extend(active.iter().filter_map(|worker| self.refill(worker)));
        actions
    }

    /// Record that `worker` finished `item` and refill the worker if needed.
    pub fn mark_complete(
        &mut self,
        worker: &WorkerId,
        item: &str,
    ) -> Result<Option<Action>, ScheduleError> {
        let record = self
            .workers
            .get_mut(worker)
            .ok_or_else(|| ScheduleError::UnknownWorker {
                worker: worker.clone(),
            })?;

        if !record.pending.shift_remove(item) {
            return Err(ScheduleError::UnexpectedCompletion {
                worker: worker.clone(),
                item: ItemId::from(item),
            });
        }
        record.completed += 1;

        Ok(self.refill(worker))
    }

    /// Forget about `worker` and return the items it did not complete.
    ///
    /// Those items are not requeued, deciding what happens to them is up to
    /// the caller.
    pub fn remove_worker(&mut self, worker: &WorkerId) -> Result<Vec<ItemId>, ScheduleError> {
        let record = self
            .workers
            .shift_remove(worker)
            .ok_or_else(|| ScheduleError::UnknownWorker {
                worker: worker.clone(),
            })?;

        if !record.pending.is_empty() {
            warn!(
                worker = %worker,
                pending = record.pending.len(),
                "worker removed with pending items"
            );
        }
        Ok(record.pending.into_iter().collect())
    }

    pub fn worker(&self, worker: &WorkerId) -> Option<&WorkerRecord> {
        self.workers.get(worker)
    }

    pub fn workers(&self) -> impl ExactSizeIterator<Item = &WorkerRecord> {
        self.workers.values()
    }

    /// Number of work units not assigned yet.
    pub fn queued_units(&self) -> usize {
        self.queue.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty() || self.workers.values().any(|r| !r.pending.is_empty())
    }

    pub fn is_finished(&self) -> bool {
        !self.has_pending()
    }

    fn refill(&mut self, worker: &WorkerId) -> Option<Action> {
        let record = self.workers.get_mut(worker)?;
        if record.shutting_down {
            return None;
        }

        if self.queue.is_empty() {
            debug!(worker = %worker, "no work left, shutting down");
            record.shutting_down = true;
            return Some(Action::Shutdown(worker.clone()));
        }

        if record.pending.len() > self.low_watermark.get() {
            return None;
        }

        self.assign_unit(worker)
    }

    fn assign_unit(&mut self, worker: &WorkerId) -> Option<Action> {
        let record = self.workers.get_mut(worker)?;
        let unit = self.queue.pop_front()?;

        record.pending.extend(unit.items.iter().cloned());
        record.units.push(unit.scope.clone());
        debug!(
            worker = %worker,
            scope = %unit.scope,
            items = unit.items.len(),
            pending = record.pending.len(),
            "assigned work unit"
        );

        Some(Action::Assign(Assignment {
            worker: worker.clone(),
            scope: unit.scope,
            items: unit.items,
        }))
    }
}
