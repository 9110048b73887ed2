//! Agreement on the collected items across all workers.
//!
//! Every worker collects the full item list on its own and reports it once.
//! Nothing is dispatched until all expected workers have reported and all of
//! them collected exactly the same items in exactly the same order. The first
//! report becomes the canonical collection, later ones are compared against it.
//!
//! The registry is an explicit state machine:
//!
//! | state        | event                          | next state   |
//! |--------------|--------------------------------|--------------|
//! | `Collecting` | report, more expected          | `Collecting` |
//! | `Collecting` | last report, all identical     | `Ready`      |
//! | `Collecting` | last report, any differs       | `Aborted`    |
//! | `Collecting` | repeated report of a worker    | `Aborted`    |
//! | `Collecting` | first report repeats an item   | `Aborted`    |
//! | `Ready`      | any report                     | `Aborted`    |
//! | any          | abort                          | `Aborted`    |
//!
//! `Aborted` is terminal. `Ready` is entered at most once.

use std::{collections::HashSet, num::NonZeroUsize};

use indexmap::IndexMap;
use tracing::{debug, error, info};

use crate::{
    diff::CollectionDiff,
    error::ScheduleError,
    item::{ItemId, WorkerId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Collecting,
    Ready,
    Aborted,
}

/// Inputs that move a [`CollectionRegistry`] between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A report that still leaves workers outstanding.
    Accepted,
    /// The last expected report, identical to the canonical collection.
    Agreed,
    /// The last expected report, but some collection differs.
    Disagreed,
    /// A worker reported twice, reported after the registry was ready or
    /// collected an item more than once.
    Violation,
    Abort,
}

impl RegistryState {
    /// The transition table of the registry.
    ///
    /// Returns `None` for events that are not valid in the current state.
    pub fn next(self, event: RegistryEvent) -> Option<RegistryState> {
        use RegistryEvent as E;
        use RegistryState as S;

        match (self, event) {
            (S::Collecting, E::Accepted) => Some(S::Collecting),
            (S::Collecting, E::Agreed) => Some(S::Ready),
            (S::Collecting, E::Disagreed) => Some(S::Aborted),
            (S::Collecting | S::Ready, E::Violation) => Some(S::Aborted),
            (_, E::Abort) => Some(S::Aborted),
            (S::Ready, E::Accepted | E::Agreed | E::Disagreed) => None,
            (S::Aborted, _) => None,
        }
    }
}

/// What a successful [`CollectionRegistry::report`] led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Still waiting for `remaining` workers to report.
    Pending { remaining: usize },
    /// All workers reported identical collections.
    Ready,
}

#[derive(Debug)]
pub struct CollectionRegistry {
    expected: NonZeroUsize,
    state: RegistryState,
    collections: IndexMap<WorkerId, Vec<ItemId>>,
}

impl CollectionRegistry {
    pub fn new(expected: NonZeroUsize) -> Self {
        Self {
            expected,
            state: RegistryState::Collecting,
            collections: IndexMap::new(),
        }
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == RegistryState::Ready
    }

    /// The agreed collection, once the registry is ready.
    pub fn canonical(&self) -> Option<&[ItemId]> {
        match self.state {
            RegistryState::Ready => self.collections.first().map(|(_, items)| items.as_slice()),
            RegistryState::Collecting | RegistryState::Aborted => None,
        }
    }

    /// The workers that reported so far, in reporting order.
    pub fn workers(&self) -> impl ExactSizeIterator<Item = &WorkerId> {
        self.collections.keys()
    }

    /// Accept the collection of one worker.
    ///
    /// Any error leaves the registry in the `Aborted` state.
    pub fn report(
        &mut self,
        worker: WorkerId,
        items: Vec<ItemId>,
    ) -> Result<Collection, ScheduleError> {
        match self.state {
            RegistryState::Aborted => return Err(ScheduleError::Aborted),
            RegistryState::Ready => {
                self.transition(RegistryEvent::Violation);
                return Err(ScheduleError::LateReport { worker });
            }
            RegistryState::Collecting => {}
        }

        if self.collections.contains_key(&worker) {
            self.transition(RegistryEvent::Violation);
            return Err(ScheduleError::DuplicateReport { worker });
        }

        // Later collections must equal the first one, so checking it is enough.
        if self.collections.is_empty() {
            if let Some(item) = first_repeated(&items) {
                self.transition(RegistryEvent::Violation);
                return Err(ScheduleError::DuplicateItem { worker, item });
            }
        }

        debug!(worker = %worker, items = items.len(), "collection reported");
        self.collections.insert(worker, items);

        let remaining = self.expected.get().saturating_sub(self.collections.len());
        if remaining > 0 {
            self.transition(RegistryEvent::Accepted);
            return Ok(Collection::Pending { remaining });
        }

        let diffs = self.diffs();
        if !diffs.is_empty() {
            for diff in &diffs {
                error!(base = %diff.base, other = %diff.other, "collections differ\n{diff}");
            }
            self.transition(RegistryEvent::Disagreed);
            return Err(ScheduleError::CollectionMismatch { diffs });
        }

        // Every other list equals the canonical one, only keep the first.
        for items in self.collections.values_mut().skip(1) {
            *items = Vec::new();
        }
        self.transition(RegistryEvent::Agreed);
        info!(
            workers = self.collections.len(),
            items = self.canonical().map_or(0, <[ItemId]>::len),
            "all workers agree on the collection"
        );
        Ok(Collection::Ready)
    }

    /// Abort the registry, further reports are rejected.
    pub fn abort(&mut self) {
        self.transition(RegistryEvent::Abort);
    }

    fn diffs(&self) -> Vec<CollectionDiff> {
        let mut collections = self.collections.iter();
        let Some((base, base_items)) = collections.next() else {
            return Vec::new();
        };
        collections
            .filter_map(|(other, other_items)| {
                CollectionDiff::between(base, base_items, other, other_items)
            })
            .collect()
    }

    fn transition(&mut self, event: RegistryEvent) {
        if let Some(next) = self.state.next(event) {
            self.state = next;
        }
    }
}

fn first_repeated(items: &[ItemId]) -> Option<ItemId> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().find(|item| !seen.insert(*item)).cloned()
}
