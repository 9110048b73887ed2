//! Diff-style summaries of collections that disagree with the canonical one.

use std::{
    collections::HashSet,
    fmt::{self, Display},
};

use crate::item::{ItemId, WorkerId};

/// How one worker's collection differs from the canonical collection.
///
/// `missing` holds items the canonical worker collected but `other` did not,
/// `extra` the reverse, both in the order they were collected. When both are
/// empty the collections hold the same items in a different order, and
/// `first_divergence` names the first index where they disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDiff {
    pub base: WorkerId,
    pub other: WorkerId,
    pub missing: Vec<ItemId>,
    pub extra: Vec<ItemId>,
    pub first_divergence: Option<Divergence>,
}

/// The first position at which two collections disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    pub index: usize,
    pub base: Option<ItemId>,
    pub other: Option<ItemId>,
}

impl CollectionDiff {
    /// Compare `other_items` against `base_items`.
    ///
    /// Returns `None` if both lists are identical.
    pub fn between(
        base: &WorkerId,
        base_items: &[ItemId],
        other: &WorkerId,
        other_items: &[ItemId],
    ) -> Option<Self> {
        if base_items == other_items {
            return None;
        }

        let base_set: HashSet<&ItemId> = base_items.iter().collect();
        let other_set: HashSet<&ItemId> = other_items.iter().collect();
        let missing = base_items
            .iter()
            .filter(|item| !other_set.contains(item))
            .cloned()
            .collect();
        let extra = other_items
            .iter()
            .filter(|item| !base_set.contains(item))
            .cloned()
            .collect();

        let index = base_items
            .iter()
            .zip(other_items)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| base_items.len().min(other_items.len()));

        Some(Self {
            base: base.clone(),
            other: other.clone(),
            missing,
            extra,
            first_divergence: Some(Divergence {
                index,
                base: base_items.get(index).cloned(),
                other: other_items.get(index).cloned(),
            }),
        })
    }

    /// Whether both collections hold the same items, only ordered differently.
    pub fn is_reordering(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

impl Display for CollectionDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "different items were collected between {} and {}, the difference is:",
            self.base, self.other
        )?;
        writeln!(f, "--- {}", self.base)?;
        writeln!(f, "+++ {}", self.other)?;
        for item in &self.missing {
            writeln!(f, "-{item}")?;
        }
        for item in &self.extra {
            writeln!(f, "+{item}")?;
        }

        if let (true, Some(divergence)) = (self.is_reordering(), &self.first_divergence) {
            let show = |item: &Option<ItemId>| match item {
                Some(item) => item.to_string(),
                None => "<end>".to_string(),
            };
            writeln!(
                f,
                "same items in a different order, first difference at index {}: {} vs {}",
                divergence.index,
                show(&divergence.base),
                show(&divergence.other)
            )?;
        }

        Ok(())
    }
}
