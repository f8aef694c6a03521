//! Hardware-independent core library for watt-rs
//!
//! This crate contains all platform-agnostic logic for the daily energy usage
//! display: decoding power meter telemetry, aggregating it into daily totals
//! and a wattage histogram, and rendering the report to a monochrome panel.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod aggregator;
pub mod config;
pub mod display_manager;
pub mod framebuffer;
pub mod handler;
pub mod render;
pub mod sample;
pub mod shared;
pub mod summary;

pub use aggregator::{BUCKET_COUNT, DailyAggregator, LocalTime};
pub use handler::{BrokerEvent, HandlerOutcome, LinkStatus, TelemetryHandler};
pub use sample::{DecodeError, JsonSampleDecoder, Sample, SampleDecoder};
pub use summary::Summary;
