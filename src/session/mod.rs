//! Driving a [`Scheduler`] from worker events.
//!
//! A session is the controller's event loop. Workers run elsewhere (threads,
//! processes, other machines) and report back over a single
//! [`crossbeam_channel`] receiver. The session feeds each [`WorkerEvent`] into
//! the scheduler in arrival order and delivers the resulting actions through
//! each worker's [`WorkerChannel`].
//!
//! Everything runs on the thread calling [`Session::run`], so the scheduler
//! state needs no locking. Any scheduling error aborts the session: the
//! scheduler stops handing out work, every worker is told to abort and the
//! error is returned.

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::{
    dispatch::Action,
    error::ScheduleError,
    item::{ItemId, WorkerId},
    registry::RegistryState,
    scheduler::Scheduler,
    scope::ScopeResolver,
};

mod worker;
pub use worker::*;

/// Something a worker tells the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// The worker collected these items, in this order.
    Collected { worker: WorkerId, items: Vec<ItemId> },
    /// The worker finished running `item`.
    Completed { worker: WorkerId, item: ItemId },
    /// The worker went away.
    Down { worker: WorkerId },
}

/// The result of a finished session.
#[derive(Debug)]
#[non_exhaustive]
pub struct SessionReport {
    /// Completed items in the order their completion arrived.
    pub completed: Vec<(WorkerId, ItemId)>,
    /// Scope keys of the work units each worker received, in assignment order.
    pub units: IndexMap<WorkerId, Vec<Box<str>>>,
    /// Items left pending on workers that went down.
    pub unfinished: Vec<(WorkerId, Vec<ItemId>)>,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct Session<S, W> {
    scheduler: Scheduler<S>,
    workers: IndexMap<WorkerId, W>,
    events: Receiver<WorkerEvent>,
}

impl<S, W> Session<S, W> {
    pub fn new(scheduler: Scheduler<S>, events: Receiver<WorkerEvent>) -> Self {
        Self {
            scheduler,
            workers: IndexMap::new(),
            events,
        }
    }

    pub fn with_worker(mut self, id: impl Into<WorkerId>, channel: W) -> Self {
        self.workers.insert(id.into(), channel);
        self
    }
}

impl<S, W> Session<S, W>
where
    S: ScopeResolver,
    W: WorkerChannel,
{
    /// Process worker events until every item completed.
    ///
    /// Fails right away unless exactly one channel was registered per
    /// expected worker.
    pub fn run(mut self) -> Result<SessionReport, ScheduleError> {
        let expected = self.scheduler.config().expected_workers().get();
        if self.workers.len() != expected {
            let registered = self.workers.len();
            return Err(self.abort(ScheduleError::WorkerCountMismatch {
                expected,
                registered,
            }));
        }

        let now = Instant::now();
        let mut report = SessionReport {
            completed: Vec::new(),
            units: IndexMap::new(),
            unfinished: Vec::new(),
            duration: Duration::ZERO,
        };

        while !self.scheduler.is_finished() {
            let Ok(event) = self.events.recv() else {
                return Err(self.abort(ScheduleError::Disconnected));
            };
            match self.handle(event, &mut report) {
                Ok(actions) => self.deliver(actions, &mut report),
                Err(err) => return Err(self.abort(err)),
            }
        }

        report.duration = now.elapsed();
        info!(
            completed = report.completed.len(),
            duration = ?report.duration,
            "session finished"
        );
        Ok(report)
    }

    fn handle(
        &mut self,
        event: WorkerEvent,
        report: &mut SessionReport,
    ) -> Result<Vec<Action>, ScheduleError> {
        match event {
            WorkerEvent::Collected { worker, items } => {
                if !self.workers.contains_key(&worker) {
                    return Err(ScheduleError::UnknownWorker { worker });
                }
                self.scheduler.report_collection(worker, items)
            }
            WorkerEvent::Completed { worker, item } => {
                let action = self.scheduler.mark_complete(&worker, &item)?;
                report.completed.push((worker, item));
                Ok(action.into_iter().collect())
            }
            WorkerEvent::Down { worker } => {
                if self.scheduler.state() != RegistryState::Ready {
                    return Err(ScheduleError::WorkerLost { worker });
                }
                let pending = self.scheduler.remove_worker(&worker)?;
                self.workers.shift_remove(&worker);
                if !pending.is_empty() {
                    report.unfinished.push((worker, pending));
                }
                Ok(Vec::new())
            }
        }
    }

    fn deliver(&self, actions: Vec<Action>, report: &mut SessionReport) {
        for action in actions {
            let Some(channel) = self.workers.get(action.worker()) else {
                warn!(worker = %action.worker(), "dropping action for unknown worker");
                continue;
            };
            match action {
                Action::Assign(assignment) => {
                    debug!(worker = %assignment.worker, scope = %assignment.scope, "sending work unit");
                    report
                        .units
                        .entry(assignment.worker)
                        .or_default()
                        .push(assignment.scope);
                    channel.run(assignment.items);
                }
                Action::Shutdown(_) => channel.shutdown(),
            }
        }
    }

    fn abort(&mut self, err: ScheduleError) -> ScheduleError {
        error!(error = %err, "aborting session");
        self.scheduler.abort();
        let reason = err.to_string();
        for channel in self.workers.values() {
            channel.abort(&reason);
        }
        err
    }
}
