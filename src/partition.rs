//! Splitting the canonical collection into work units.

use indexmap::IndexMap;

use crate::{error::ScheduleError, item::ItemId, scope::ScopeResolver};

/// The smallest block of items handed to a single worker.
///
/// All items of a unit share one scope key. A unit is built once, never
/// split, and assigned to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub scope: Box<str>,
    pub items: Vec<ItemId>,
}

impl WorkUnit {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Group `items` into work units by their scope key.
///
/// Units come out in the order their scope key is first seen in `items`, and
/// each unit keeps its items in their original relative order. The result is
/// therefore fully determined by the collection and the resolver.
pub fn partition<S>(items: &[ItemId], resolver: &S) -> Result<Vec<WorkUnit>, ScheduleError>
where
    S: ScopeResolver + ?Sized,
{
    let mut units: IndexMap<Box<str>, Vec<ItemId>> = IndexMap::new();
    for item in items {
        let scope = resolver
            .resolve(item)
            .ok_or_else(|| ScheduleError::UnresolvedScope { item: item.clone() })?;
        match units.get_mut(scope.as_ref()) {
            Some(unit) => unit.push(item.clone()),
            None => {
                units.insert(scope.into(), vec![item.clone()]);
            }
        }
    }

    Ok(units
        .into_iter()
        .map(|(scope, items)| WorkUnit { scope, items })
        .collect())
}
