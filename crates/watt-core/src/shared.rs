//! Aggregator guarded by a critical-section mutex.
//!
//! For targets where telemetry is received in one task and the display is
//! refreshed from another. The lock is held for a single ingest only; decoding
//! and drawing happen outside it.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::aggregator::{DailyAggregator, LocalTime};
use crate::sample::Sample;
use crate::summary::Summary;

/// A [`DailyAggregator`] that can live in a `static`.
///
/// ```rust,ignore
/// static AGGREGATOR: SharedAggregator = SharedAggregator::new();
///
/// let summary = AGGREGATOR.ingest(sample, now);
/// ```
pub struct SharedAggregator {
    inner: Mutex<CriticalSectionRawMutex, RefCell<DailyAggregator>>,
}

impl Default for SharedAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedAggregator {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(DailyAggregator::new())),
        }
    }

    /// Ingest one sample while holding the lock
    pub fn ingest(&self, sample: Sample, now: LocalTime) -> Summary {
        self.inner
            .lock(|aggregator| aggregator.borrow_mut().ingest(sample, now))
    }

    /// Read the aggregator while holding the lock
    pub fn with<R>(&self, f: impl FnOnce(&DailyAggregator) -> R) -> R {
        self.inner.lock(|aggregator| f(&*aggregator.borrow()))
    }
}
