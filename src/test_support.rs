use std::num::NonZeroUsize;

use crate::{config::SchedulerConfig, item::ItemId};

macro_rules! items {
    [$($item:expr),* $(,)?] => {
        vec![$($crate::item::ItemId::from($item)),*]
    };
}

pub(crate) use items;

macro_rules! nonzero {
    (0) => {
        compile_error!("0 is zero")
    };

    ($value:literal) => {
        std::num::NonZeroUsize::new($value).unwrap()
    };
}

pub(crate) use nonzero;

/// Build `count` items named `t/test_{idx}.py::test`.
pub fn numbered_items(count: usize) -> Vec<ItemId> {
    (0..count)
        .map(|idx| ItemId::from(format!("t/test_{idx}.py::test")))
        .collect()
}

pub fn config(workers: usize, low_watermark: usize) -> SchedulerConfig {
    SchedulerConfig::new(NonZeroUsize::new(workers).unwrap())
        .with_low_watermark(NonZeroUsize::new(low_watermark).unwrap())
}
