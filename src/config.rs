use std::num::NonZeroUsize;

const DEFAULT_LOW_WATERMARK: NonZeroUsize = NonZeroUsize::new(2).unwrap();

/// Construction-time settings of a [`Scheduler`](crate::Scheduler).
///
/// `expected_workers` is the number of workers that must report a collection
/// before anything is dispatched. `low_watermark` is the pending item count at
/// or below which a worker gets another work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    expected_workers: NonZeroUsize,
    low_watermark: NonZeroUsize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }
}

impl SchedulerConfig {
    pub fn new(expected_workers: NonZeroUsize) -> Self {
        Self {
            expected_workers,
            low_watermark: DEFAULT_LOW_WATERMARK,
        }
    }

    pub fn with_expected_workers(self, expected_workers: NonZeroUsize) -> Self {
        Self {
            expected_workers,
            ..self
        }
    }

    pub fn with_low_watermark(self, low_watermark: NonZeroUsize) -> Self {
        Self {
            low_watermark,
            ..self
        }
    }

    pub fn expected_workers(&self) -> NonZeroUsize {
        self.expected_workers
    }

    pub fn low_watermark(&self) -> NonZeroUsize {
        self.low_watermark
    }
}
