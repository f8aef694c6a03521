//! Desktop simulator for the watt-rs daily energy report.
//!
//! Plays the part of the broker connection and the OLED panel so the core can
//! be exercised without hardware. Telemetry payloads come from a file, stdin,
//! or a synthetic power meter; the last frame is written to a PNG.
//!
//! # Usage
//!
//! | Command                                        | Effect                              |
//! |------------------------------------------------|-------------------------------------|
//! | `watt-simulator < readings.jsonl`              | One JSON payload per line from stdin |
//! | `watt-simulator --input readings.jsonl`        | Same, from a file                   |
//! | `watt-simulator --synthetic 2000`              | 2000 generated one-minute samples   |
//! | `watt-simulator --config device.json ...`      | Read `mqtt.sub` from a config file  |
//!
//! Set `RUST_LOG=info` (or `debug`) to follow every ingest.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Datelike, Local, TimeDelta, Timelike};
use clap::Parser;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{BinaryColorTheme, OutputSettingsBuilder, SimulatorDisplay};
use log::{error, info, warn};

use watt_core::aggregator::MS_PER_HOUR;
use watt_core::config::Config;
use watt_core::display_manager::DisplayManager;
use watt_core::framebuffer::FrameBuffer;
use watt_core::render::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};
use watt_core::{
    BrokerEvent, DailyAggregator, HandlerOutcome, JsonSampleDecoder, LocalTime, Sample, Summary,
    TelemetryHandler,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Topic used when the configuration does not name one.
const FALLBACK_TOPIC: &str = "power/meter";

/// Duration covered by each synthetic sample.
const MOCK_SAMPLE_DURATION_MS: u32 = 60_000;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "watt-simulator",
    about = "Feed power telemetry through the watt-rs core and render the daily report"
)]
struct Args {
    /// Newline-delimited JSON payloads (reads stdin when omitted)
    #[arg(short, long, conflicts_with = "synthetic")]
    input: Option<PathBuf>,

    /// Generate this many synthetic samples instead of reading payloads
    #[arg(long)]
    synthetic: Option<usize>,

    /// Device configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the final frame
    #[arg(short, long, default_value = "watt-report.png")]
    output: PathBuf,

    /// Pixel scale of the output image
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    scale: u32,
}

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

/// Generates power readings on a simulated clock.
///
/// One pulse is one watt-hour. Fractional energy carries over to the next
/// sample so the pulse total tracks the generated wattage.
struct MockMeter {
    clock: DateTime<Local>,
    elapsed_secs: f64,
    pulse_remainder: f64,
}

impl MockMeter {
    fn new(start: DateTime<Local>) -> Self {
        Self {
            clock: start,
            elapsed_secs: 0.0,
            pulse_remainder: 0.0,
        }
    }

    /// Advance the clock by one sample and return the reading with its
    /// arrival time.
    fn next_sample(&mut self) -> (Sample, DateTime<Local>) {
        let t = self.elapsed_secs;

        // Base load with a slow swing, a faster ripple and a kettle-sized
        // spike for ten minutes every three hours
        let spike = if (t % 10_800.0) < 600.0 { 1600.0 } else { 0.0 };
        let watts = (420.0 + 260.0 * (t / 5_400.0).sin() + 90.0 * (t / 420.0).cos() + spike).max(0.0);

        let energy_wh = watts * f64::from(MOCK_SAMPLE_DURATION_MS) / MS_PER_HOUR + self.pulse_remainder;
        let pulses = energy_wh.floor();
        self.pulse_remainder = energy_wh - pulses;

        self.elapsed_secs += f64::from(MOCK_SAMPLE_DURATION_MS) / 1000.0;
        self.clock += TimeDelta::milliseconds(i64::from(MOCK_SAMPLE_DURATION_MS));

        (
            Sample::new(MOCK_SAMPLE_DURATION_MS, watts as i32, pulses as u32),
            self.clock,
        )
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Convert a wall clock reading into the core's day/hour/minute form.
fn local_time(at: &DateTime<Local>) -> LocalTime {
    LocalTime::new(at.ordinal0() as u16, at.hour() as u8, at.minute() as u8)
}

/// Everything the firmware would own: aggregator, handler, screen and panel.
struct Session {
    handler: TelemetryHandler<JsonSampleDecoder>,
    aggregator: DailyAggregator,
    screen: DisplayManager,
    framebuffer: FrameBuffer,
    panel: SimulatorDisplay<BinaryColor>,
    topic: String,
    reports: usize,
    dropped: usize,
}

impl Session {
    fn new(topic: String) -> Self {
        Self {
            handler: TelemetryHandler::new(JsonSampleDecoder),
            aggregator: DailyAggregator::new(),
            screen: DisplayManager::new(),
            framebuffer: FrameBuffer::new(),
            panel: SimulatorDisplay::new(Size::new(
                DISPLAY_WIDTH_PX as u32,
                DISPLAY_HEIGHT_PX as u32,
            )),
            topic,
            reports: 0,
            dropped: 0,
        }
    }

    /// Bring the link up the way the broker would: connect, then subscribe.
    fn connect(&mut self) {
        self.refresh();
        self.deliver(BrokerEvent::Connected { return_code: 0 }, Local::now());
        info!("Subscribing to {}", self.topic);
        self.deliver(BrokerEvent::Subscribed { message_id: 1 }, Local::now());
    }

    /// Deliver a payload published on the subscribed topic.
    fn publish(&mut self, payload: &[u8], at: DateTime<Local>) {
        let topic = self.topic.clone();
        self.deliver(
            BrokerEvent::Publish {
                topic: &topic,
                payload,
            },
            at,
        );
    }

    fn deliver(&mut self, event: BrokerEvent<'_>, at: DateTime<Local>) {
        let outcome = self
            .handler
            .handle(&mut self.aggregator, event, local_time(&at));

        match &outcome {
            HandlerOutcome::Report(summary) => {
                self.reports += 1;
                log_summary(summary);
            }
            HandlerOutcome::Dropped(_) => self.dropped += 1,
            HandlerOutcome::Status(status) => info!("Link status: {}", status.label()),
        }

        if self.screen.apply(&outcome) {
            self.refresh();
        }
    }

    /// Draw the current screen into the framebuffer and flush it to the panel.
    fn refresh(&mut self) {
        let drawn = self
            .screen
            .draw(&mut self.framebuffer)
            .unwrap_or_else(|never| match never {});

        if drawn {
            self.framebuffer
                .flush(&mut self.panel)
                .unwrap_or_else(|never| match never {});
        }
    }
}

fn log_summary(summary: &Summary) {
    info!(
        "{:02}:{:02} {} W | min {} W | total {} | avg {:.0} W | cost {:.2}",
        summary.time.hour,
        summary.time.minute,
        summary.instant_watts,
        summary.min_watts,
        summary.total_pulses,
        summary.average_watts,
        summary.estimated_daily_cost
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    info!("Starting watt-rs simulator");

    let config_bytes = match &args.config {
        Some(path) => fs::read(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => Vec::new(),
    };
    let config = if config_bytes.is_empty() {
        Config::default()
    } else {
        Config::from_json(&config_bytes).map_err(|e| anyhow!("{}", e))?
    };

    let topic = match config.subscription_topic() {
        Ok(topic) => topic.to_owned(),
        Err(e) => {
            error!("{}", e);
            warn!("Falling back to topic {}", FALLBACK_TOPIC);
            FALLBACK_TOPIC.to_owned()
        }
    };

    let mut session = Session::new(topic);
    session.connect();

    match args.synthetic {
        Some(count) => {
            let mut meter = MockMeter::new(Local::now());
            for _ in 0..count {
                let (sample, at) = meter.next_sample();
                let payload = serde_json::to_vec(&sample).context("Failed to encode sample")?;
                session.publish(&payload, at);
            }
        }
        None => {
            let reader: Box<dyn BufRead> = match &args.input {
                Some(path) => Box::new(BufReader::new(
                    File::open(path)
                        .with_context(|| format!("Failed to open {}", path.display()))?,
                )),
                None => Box::new(io::stdin().lock()),
            };

            for line in reader.lines() {
                let line = line.context("Failed to read payload")?;
                if line.trim().is_empty() {
                    continue;
                }
                session.publish(line.as_bytes(), Local::now());
            }
        }
    }

    info!(
        "Processed {} reports, dropped {} payloads",
        session.reports, session.dropped
    );

    let output_settings = OutputSettingsBuilder::new()
        .scale(args.scale)
        .theme(BinaryColorTheme::OledWhite)
        .build();
    session
        .panel
        .to_rgb_output_image(&output_settings)
        .save_png(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!("Wrote {}", args.output.display());
    Ok(())
}
