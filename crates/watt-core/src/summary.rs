//! Renderable snapshot of the current day

use crate::aggregator::{BUCKET_COUNT, LocalTime};

/// Immutable view of today's usage, produced by every ingest.
///
/// Holds a copy of the histogram so the renderer never borrows the
/// aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Wattage of the sample that produced this summary
    pub instant_watts: i32,
    /// Lowest wattage seen today
    pub min_watts: i32,
    /// Pulses counted today
    pub total_pulses: u64,
    /// Average power today, 0 when no time has elapsed
    pub average_watts: f32,
    /// Projected cost for a whole day at `average_watts`
    pub estimated_daily_cost: f32,
    /// Pulses per 100 W bucket
    pub histogram: [u64; BUCKET_COUNT],
    /// Largest bucket value (0 when all buckets are empty)
    pub peak_bucket: u64,
    /// Local time the sample was received
    pub time: LocalTime,
}

impl Summary {
    pub fn new(
        instant_watts: i32,
        min_watts: i32,
        total_pulses: u64,
        average_watts: f32,
        estimated_daily_cost: f32,
        histogram: [u64; BUCKET_COUNT],
        time: LocalTime,
    ) -> Self {
        let peak_bucket = histogram.iter().copied().max().unwrap_or(0);

        Self {
            instant_watts,
            min_watts,
            total_pulses,
            average_watts,
            estimated_daily_cost,
            histogram,
            peak_bucket,
            time,
        }
    }

    /// Denominator for bar scaling, never zero.
    pub fn scale_denominator(&self) -> u64 {
        self.peak_bucket.max(1)
    }

    /// Height of the bar for `bucket` when the tallest bar is `area_height`.
    ///
    /// Out-of-range bucket indices yield 0.
    pub fn bar_height(&self, area_height: u32, bucket: usize) -> u32 {
        let Some(&value) = self.histogram.get(bucket) else {
            return 0;
        };

        let height = u128::from(area_height) * u128::from(value) / u128::from(self.scale_denominator());
        height.min(u128::from(area_height)) as u32
    }
}
