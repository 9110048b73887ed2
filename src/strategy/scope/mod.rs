//! Scope resolution for kidist.
//!
//! A scope key decides which collected items travel together. Items that share
//! a scope key are bundled into one [`WorkUnit`](crate::partition::WorkUnit),
//! and a work unit is always handed to exactly one worker in one piece. This is
//! how callers ask for co-location: tests that share a fixture or rely on
//! ordering get the same key and therefore the same worker.
//!
//! The partitioner does not care how a key is derived. It is handed a
//! [`ScopeResolver`] when the [`Scheduler`](crate::Scheduler) is built and
//! asks it once per item. Two resolvers ship with the crate:
//! - [`GroupScope`] groups items by their trailing `@group` tag
//! - [`EachScope`] gives every item its own scope
//!
//! Implement [`ScopeResolver`] to define a different grouping.

use std::borrow::Cow;

mod group;
pub use group::*;

mod each;
pub use each::*;

/// A strategy for deriving the scope key of an item.
///
/// The resolver must be a pure function of the item id: the same id always
/// yields the same key and resolving has no side effects. The partitioner
/// relies on this to build the same work units on every run for the same
/// collection.
///
/// Returning `None` means the item could not be classified. The partitioner
/// treats that as fatal, because placing an item in the wrong unit would break
/// co-location.
///
/// For simple setups `ScopeResolver` is implemented for
/// `Fn(&str) -> String`, so a closure can act as a resolver.
pub trait ScopeResolver {
    /// Return the scope key for an item id.
    fn resolve<'i>(&self, item: &'i str) -> Option<Cow<'i, str>>;
}

impl<F> ScopeResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve<'i>(&self, item: &'i str) -> Option<Cow<'i, str>> {
        Some(Cow::Owned(self(item)))
    }
}
