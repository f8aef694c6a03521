//! Daily energy usage aggregation.
//!
//! [`DailyAggregator`] owns the running state for the current calendar day and
//! folds each incoming [`Sample`] into it. Every call to
//! [`DailyAggregator::ingest`] returns a fresh [`Summary`] that the display
//! collaborator can render without touching the aggregator again.
//!
//! ## Day rollover
//!
//! The aggregator remembers the day-of-year of the last sample it saw. When a
//! sample arrives with a different day (or the aggregator has not seen any
//! sample yet) the daily state is reset *before* the new sample is applied:
//!
//! - the minimum wattage starts over at the new sample's wattage
//! - pulse and duration totals go back to zero
//! - every histogram bucket is cleared

use log::{debug, info};

use crate::sample::Sample;
use crate::summary::Summary;

/// Number of histogram buckets
pub const BUCKET_COUNT: usize = 20;

/// Width of a single histogram bucket in watts
pub const BUCKET_WIDTH_WATTS: i32 = 100;

/// Cost per unit of average power, per hour
pub const COST_RATE_PER_UNIT: f64 = 0.00015;

/// Milliseconds in one hour, used to scale pulses to an hourly rate
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Hours in a day
const HOURS_PER_DAY: f64 = 24.0;

/// Local wall clock reading supplied by the caller.
///
/// Only `day_of_year` takes part in aggregation (rollover detection). The
/// hour and minute are carried through to the [`Summary`] for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalTime {
    /// Zero-based day of the year (0..=365)
    pub day_of_year: u16,
    /// Hour of the day (0..=23)
    pub hour: u8,
    /// Minute of the hour (0..=59)
    pub minute: u8,
}

impl LocalTime {
    pub const fn new(day_of_year: u16, hour: u8, minute: u8) -> Self {
        Self {
            day_of_year,
            hour,
            minute,
        }
    }
}

/// Map a wattage to its histogram bucket.
///
/// Negative readings land in bucket 0; anything at or above
/// `(BUCKET_COUNT - 1) * BUCKET_WIDTH_WATTS` lands in the last bucket.
pub const fn bucket_index(wattage: i32) -> usize {
    let index = wattage.div_euclid(BUCKET_WIDTH_WATTS);
    if index < 0 {
        0
    } else if index as usize >= BUCKET_COUNT {
        BUCKET_COUNT - 1
    } else {
        index as usize
    }
}

/// Average power over the day so far.
///
/// Pulses are scaled to an hourly rate. Returns 0 when no time has elapsed.
pub fn average_watts(total_pulses: u64, total_duration_ms: u64) -> f32 {
    if total_duration_ms == 0 {
        return 0.0;
    }

    (total_pulses as f64 * MS_PER_HOUR / total_duration_ms as f64) as f32
}

/// Cost estimate for a full day at the given average power.
pub fn estimated_daily_cost(average_watts: f32) -> f32 {
    (COST_RATE_PER_UNIT * average_watts as f64 * HOURS_PER_DAY) as f32
}

/// Running state for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DailyState {
    /// Day this state belongs to, `None` until the first sample arrives
    current_day: Option<u16>,
    min_watts: i32,
    total_pulses: u64,
    total_duration_ms: u64,
    histogram: [u64; BUCKET_COUNT],
}

impl DailyState {
    const fn new() -> Self {
        Self {
            current_day: None,
            min_watts: 0,
            total_pulses: 0,
            total_duration_ms: 0,
            histogram: [0; BUCKET_COUNT],
        }
    }

    /// Start a fresh day seeded with the first wattage seen on it.
    fn roll_over(&mut self, day: u16, first_watts: i32) {
        self.current_day = Some(day);
        self.min_watts = first_watts;
        self.total_pulses = 0;
        self.total_duration_ms = 0;
        self.histogram = [0; BUCKET_COUNT];
    }
}

/// Stateful aggregator for daily power usage.
///
/// Create one at startup and hand it to whatever receives telemetry. It is
/// mutated only through [`ingest`](Self::ingest).
///
/// ```rust,ignore
/// let mut aggregator = DailyAggregator::new();
///
/// let summary = aggregator.ingest(sample, LocalTime::new(41, 13, 37));
/// renderer.draw_report(&summary)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyAggregator {
    state: DailyState,
}

impl Default for DailyAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl DailyAggregator {
    /// Create an aggregator that has not seen any sample yet.
    pub const fn new() -> Self {
        Self {
            state: DailyState::new(),
        }
    }

    /// Fold a sample into today's totals and return the updated summary.
    ///
    /// Never fails: out-of-range wattages are clamped into the histogram and a
    /// zero elapsed duration yields a zero average.
    pub fn ingest(&mut self, sample: Sample, now: LocalTime) -> Summary {
        let state = &mut self.state;

        if state.current_day != Some(now.day_of_year) {
            match state.current_day {
                Some(previous) => info!(
                    "Day rollover {} -> {}, resetting daily totals",
                    previous, now.day_of_year
                ),
                None => info!("Tracking day {}", now.day_of_year),
            }
            state.roll_over(now.day_of_year, sample.wattage);
        }

        state.min_watts = state.min_watts.min(sample.wattage);

        let bucket = bucket_index(sample.wattage);
        let pulses = u64::from(sample.pulses);
        state.histogram[bucket] = state.histogram[bucket].saturating_add(pulses);
        state.total_pulses = state.total_pulses.saturating_add(pulses);
        state.total_duration_ms = state
            .total_duration_ms
            .saturating_add(u64::from(sample.duration_ms));

        debug!(
            "Ingested {} W ({} pulses over {} ms) into bucket {}",
            sample.wattage, sample.pulses, sample.duration_ms, bucket
        );

        let average = average_watts(state.total_pulses, state.total_duration_ms);

        Summary::new(
            sample.wattage,
            state.min_watts,
            state.total_pulses,
            average,
            estimated_daily_cost(average),
            state.histogram,
            now,
        )
    }

    /// Day currently being tracked, `None` before the first sample
    pub fn current_day(&self) -> Option<u16> {
        self.state.current_day
    }

    /// Lowest wattage seen today, `None` before the first sample
    pub fn min_watts(&self) -> Option<i32> {
        self.state.current_day.map(|_| self.state.min_watts)
    }

    pub fn total_pulses(&self) -> u64 {
        self.state.total_pulses
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.state.total_duration_ms
    }

    /// Pulse counts per wattage bucket for the current day
    pub fn histogram(&self) -> &[u64; BUCKET_COUNT] {
        &self.state.histogram
    }
}
