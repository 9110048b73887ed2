use tracing::{debug, info, warn};

use crate::{
    config::SchedulerConfig,
    dispatch::{Action, Dispatcher, WorkerRecord},
    error::ScheduleError,
    item::{ItemId, WorkerId},
    partition::partition,
    registry::{Collection, CollectionRegistry, RegistryState},
    scope::{GroupScope, ScopeResolver},
};

/// Distributes collected items over a fixed set of workers.
///
/// All workers report their collection through
/// [`report_collection`](Self::report_collection). Once the last expected
/// worker reported and all collections agree, the items are split into work
/// units with the scheduler's [`ScopeResolver`] and the initial distribution is
/// returned. From then on every [`mark_complete`](Self::mark_complete) may
/// hand the finishing worker another unit.
///
/// The scheduler never talks to workers. Every call returns the [`Action`]s
/// the host has to deliver. Any error aborts the scheduler, later calls return
/// [`ScheduleError::Aborted`].
///
/// The resolver defaults to [`GroupScope`]. Use
/// [`with_resolver`](Self::with_resolver) to pick another grouping.
#[derive(Debug)]
pub struct Scheduler<S = GroupScope> {
    config: SchedulerConfig,
    resolver: S,
    registry: CollectionRegistry,
    dispatcher: Option<Dispatcher>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            resolver: GroupScope,
            registry: CollectionRegistry::new(config.expected_workers()),
            dispatcher: None,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl<S> Scheduler<S> {
    pub fn with_resolver<WithResolver: ScopeResolver>(
        self,
        resolver: WithResolver,
    ) -> Scheduler<WithResolver> {
        Scheduler {
            config: self.config,
            resolver,
            registry: self.registry,
            dispatcher: self.dispatcher,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> RegistryState {
        self.registry.state()
    }

    /// The agreed collection, once all workers reported.
    pub fn collection(&self) -> Option<&[ItemId]> {
        self.registry.canonical()
    }

    /// Dispatch state of every worker, empty until the collection is agreed on.
    pub fn workers(&self) -> impl Iterator<Item = &WorkerRecord> {
        self.dispatcher.iter().flat_map(Dispatcher::workers)
    }

    /// Whether work is still queued or pending on any worker.
    pub fn has_pending(&self) -> bool {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.has_pending(),
            None => self.registry.state() == RegistryState::Collecting,
        }
    }

    /// Whether every item was assigned and completed.
    pub fn is_finished(&self) -> bool {
        self.registry.is_ready()
            && self
                .dispatcher
                .as_ref()
                .is_some_and(Dispatcher::is_finished)
    }

    /// Abort the run. No further work is handed out.
    pub fn abort(&mut self) {
        if self.registry.state() != RegistryState::Aborted {
            warn!("scheduler aborted");
        }
        self.registry.abort();
        self.dispatcher = None;
    }

    /// Forget `worker` and return the items it did not complete.
    ///
    /// Fails with [`ScheduleError::NoWorkersLeft`] if units are still queued
    /// and no remaining worker can take them.
    pub fn remove_worker(&mut self, worker: &WorkerId) -> Result<Vec<ItemId>, ScheduleError> {
        let res = self.dispatcher().and_then(|dispatcher| {
            let pending = dispatcher.remove_worker(worker)?;
            let queued = dispatcher.queued_units();
            if queued > 0 && dispatcher.workers().all(WorkerRecord::is_shutting_down) {
                return Err(ScheduleError::NoWorkersLeft {
                    worker: worker.clone(),
                    queued,
                });
            }
            Ok(pending)
        });
        match res {
            Ok(pending) => Ok(pending),
            Err(err) => self.fail(err),
        }
    }

    fn dispatcher(&mut self) -> Result<&mut Dispatcher, ScheduleError> {
        match self.registry.state() {
            RegistryState::Aborted => Err(ScheduleError::Aborted),
            RegistryState::Collecting => Err(ScheduleError::NotReady),
            RegistryState::Ready => self.dispatcher.as_mut().ok_or(ScheduleError::Aborted),
        }
    }

    fn fail<T>(&mut self, err: ScheduleError) -> Result<T, ScheduleError> {
        if !matches!(err, ScheduleError::Aborted) {
            self.abort();
        }
        Err(err)
    }
}

impl<S: ScopeResolver> Scheduler<S> {
    /// Accept the collection of `worker`.
    ///
    /// Returns no actions until the last expected worker reported, then the
    /// initial distribution.
    pub fn report_collection(
        &mut self,
        worker: WorkerId,
        items: Vec<ItemId>,
    ) -> Result<Vec<Action>, ScheduleError> {
        match self.registry.report(worker, items) {
            Ok(Collection::Pending { remaining }) => {
                debug!(remaining, "waiting for collections");
                Ok(Vec::new())
            }
            Ok(Collection::Ready) => match self.start() {
                Ok(actions) => Ok(actions),
                Err(err) => self.fail(err),
            },
            Err(err) => self.fail(err),
        }
    }

    /// Record that `worker` finished `item`.
    ///
    /// Returns the follow-up action for that worker, if any.
    pub fn mark_complete(
        &mut self,
        worker: &WorkerId,
        item: &str,
    ) -> Result<Option<Action>, ScheduleError> {
        let res = self
            .dispatcher()
            .and_then(|dispatcher| dispatcher.mark_complete(worker, item));
        match res {
            Ok(action) => Ok(action),
            Err(err) => self.fail(err),
        }
    }

    fn start(&mut self) -> Result<Vec<Action>, ScheduleError> {
        let items = self.registry.canonical().ok_or(ScheduleError::NotReady)?;
        let units = partition(items, &self.resolver)?;
        info!(
            items = items.len(),
            units = units.len(),
            workers = self.registry.workers().len(),
            "distributing work units"
        );

        let mut dispatcher = Dispatcher::new(
            units,
            self.registry.workers().cloned(),
            self.config.low_watermark(),
        );
        let actions = dispatcher.start();
        self.dispatcher = Some(dispatcher);
        Ok(actions)
    }
}
