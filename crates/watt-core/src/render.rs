//! Report and status screens for the 128x64 monochrome OLED.
//!
//! The panel is mounted rotated, so everything here is laid out for a
//! 64 pixel wide, 128 pixel tall portrait screen:
//!
//! ```text
//! +--------+   y = 0
//! |  512   |   instantaneous watts
//! +--------+   y = 30
//! Min: 180     y = 35, one 8 px line each
//! Tot: 4211
//! Avg: 402
//! Cost: 1.45
//! RX: 13:37
//!              y = 75
//!  |  ||       histogram, bars grow up from the bottom edge
//! ||||||| |    y = 127
//! ```

use core::fmt::Write;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_5X8, FONT_9X15, FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

use crate::aggregator::BUCKET_COUNT;
use crate::handler::LinkStatus;
use crate::summary::Summary;

/// Panel width in portrait orientation
pub const DISPLAY_WIDTH_PX: i32 = 64;

/// Panel height in portrait orientation
pub const DISPLAY_HEIGHT_PX: i32 = 128;

// ============================================================================
// Instantaneous Watts Box
// ============================================================================

/// Size of the outlined box around the instantaneous reading
const WATTS_BOX_SIZE: Size = Size::new(64, 30);

/// Top-left corner of the instantaneous reading text
const WATTS_TEXT_ORIGIN: Point = Point::new(5, 5);

/// Readings at or above this use the smaller font so they fit the box
const LARGE_FONT_LIMIT_WATTS: i32 = 1000;

// ============================================================================
// Report Lines
// ============================================================================

/// Y coordinate of the first report line
const REPORT_TOP_PX: i32 = 35;

/// Height of one report line (FONT_5X8)
const LINE_HEIGHT_PX: i32 = 8;

/// Number of report lines drawn below the box
const REPORT_LINE_COUNT: i32 = 5;

/// Capacity of a formatted report line, wide enough for a saturated
/// `u64` total and the cost derived from it
const LINE_CAPACITY: usize = 48;

// ============================================================================
// Histogram
// ============================================================================

/// Y coordinate just below the last report line
pub const HISTOGRAM_TOP_PX: i32 = REPORT_TOP_PX + REPORT_LINE_COUNT * LINE_HEIGHT_PX;

/// Gap kept between the report lines and the tallest bar
const HISTOGRAM_MARGIN_PX: i32 = 5;

/// Height available to the tallest histogram bar
pub const HISTOGRAM_HEIGHT_PX: u32 = (DISPLAY_HEIGHT_PX - HISTOGRAM_TOP_PX - HISTOGRAM_MARGIN_PX) as u32;

/// Width of one histogram bar
pub const BAR_WIDTH_PX: u32 = 3;

const _: () = assert!(BUCKET_COUNT as i32 * BAR_WIDTH_PX as i32 <= DISPLAY_WIDTH_PX);

/// Draw the daily report for `summary`, replacing whatever was on screen.
pub fn draw_report<D>(summary: &Summary, display: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    display.clear(BinaryColor::Off)?;

    Rectangle::new(Point::zero(), WATTS_BOX_SIZE)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(display)?;

    let watts_font = if summary.instant_watts < LARGE_FONT_LIMIT_WATTS {
        &FONT_10X20
    } else {
        &FONT_9X15
    };
    let mut line: heapless::String<LINE_CAPACITY> = heapless::String::new();
    write!(line, "{}", summary.instant_watts).ok();
    Text::with_baseline(
        &line,
        WATTS_TEXT_ORIGIN,
        MonoTextStyle::new(watts_font, BinaryColor::On),
        Baseline::Top,
    )
    .draw(display)?;

    let small = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
    let mut y = REPORT_TOP_PX;
    for row in 0..REPORT_LINE_COUNT {
        line.clear();
        match row {
            0 => write!(line, "Min: {}", summary.min_watts).ok(),
            1 => write!(line, "Tot: {}", summary.total_pulses).ok(),
            2 => write!(line, "Avg: {:.0}", summary.average_watts).ok(),
            3 => write!(line, "Cost: {:.2}", summary.estimated_daily_cost).ok(),
            _ => write!(line, "RX: {:02}:{:02}", summary.time.hour, summary.time.minute).ok(),
        };
        Text::with_baseline(&line, Point::new(0, y), small, Baseline::Top).draw(display)?;
        y += LINE_HEIGHT_PX;
    }

    draw_histogram(summary, display)
}

/// Draw one outlined bar per bucket, scaled against the tallest bucket.
fn draw_histogram<D>(summary: &Summary, display: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let outline = PrimitiveStyle::with_stroke(BinaryColor::On, 1);

    for bucket in 0..BUCKET_COUNT {
        let height = summary.bar_height(HISTOGRAM_HEIGHT_PX, bucket);
        if height == 0 {
            continue;
        }

        Rectangle::new(
            Point::new(
                bucket as i32 * BAR_WIDTH_PX as i32,
                DISPLAY_HEIGHT_PX - height as i32,
            ),
            Size::new(BAR_WIDTH_PX, height),
        )
        .into_styled(outline)
        .draw(display)?;
    }

    Ok(())
}

/// Draw a link status screen.
pub fn draw_status<D>(status: LinkStatus, display: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    display.clear(BinaryColor::Off)?;

    Text::with_baseline(
        status.label(),
        Point::new(1, 1),
        MonoTextStyle::new(&FONT_5X8, BinaryColor::On),
        Baseline::Top,
    )
    .draw(display)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::LocalTime;
    use crate::framebuffer::FrameBuffer;

    fn summary(instant_watts: i32, histogram: [u64; BUCKET_COUNT]) -> Summary {
        let total = histogram.iter().sum();
        Summary::new(
            instant_watts,
            180,
            total,
            402.0,
            1.45,
            histogram,
            LocalTime::new(40, 13, 37),
        )
    }

    fn column_lit(fb: &FrameBuffer, x: i32, from_y: i32, to_y: i32) -> bool {
        (from_y..=to_y).all(|y| fb.pixel(x, y) == Some(BinaryColor::On))
    }

    #[test]
    fn test_histogram_geometry() {
        assert_eq!(HISTOGRAM_TOP_PX, 75);
        assert_eq!(HISTOGRAM_HEIGHT_PX, 48);
    }

    #[test]
    fn test_report_draws_watts_box_outline() {
        let mut fb = FrameBuffer::new();
        draw_report(&summary(512, [0; BUCKET_COUNT]), &mut fb).unwrap();

        assert_eq!(fb.pixel(0, 0), Some(BinaryColor::On));
        assert_eq!(fb.pixel(63, 0), Some(BinaryColor::On));
        assert_eq!(fb.pixel(0, 29), Some(BinaryColor::On));
        assert_eq!(fb.pixel(63, 29), Some(BinaryColor::On));
        assert_eq!(fb.pixel(32, 30), Some(BinaryColor::Off));
    }

    #[test]
    fn test_peak_bucket_fills_histogram_area() {
        let mut histogram = [0; BUCKET_COUNT];
        histogram[5] = 4;
        histogram[8] = 2;

        let mut fb = FrameBuffer::new();
        draw_report(&summary(512, histogram), &mut fb).unwrap();

        // Bucket 5 spans x = 15..=17 and reaches the top of the area
        let top = DISPLAY_HEIGHT_PX - HISTOGRAM_HEIGHT_PX as i32;
        assert!(column_lit(&fb, 15, top, DISPLAY_HEIGHT_PX - 1));
        assert!(column_lit(&fb, 17, top, DISPLAY_HEIGHT_PX - 1));
        assert_eq!(fb.pixel(15, top - 1), Some(BinaryColor::Off));

        // Bucket 8 is half as tall
        let half_top = DISPLAY_HEIGHT_PX - (HISTOGRAM_HEIGHT_PX / 2) as i32;
        assert!(column_lit(&fb, 24, half_top, DISPLAY_HEIGHT_PX - 1));
        assert_eq!(fb.pixel(24, half_top - 1), Some(BinaryColor::Off));

        // Empty buckets draw nothing
        assert_eq!(fb.pixel(0, DISPLAY_HEIGHT_PX - 1), Some(BinaryColor::Off));
        assert_eq!(fb.pixel(57, DISPLAY_HEIGHT_PX - 1), Some(BinaryColor::Off));
    }

    #[test]
    fn test_empty_histogram_draws_no_bars() {
        let mut fb = FrameBuffer::new();
        draw_report(&summary(0, [0; BUCKET_COUNT]), &mut fb).unwrap();

        for x in 0..DISPLAY_WIDTH_PX {
            for y in HISTOGRAM_TOP_PX..DISPLAY_HEIGHT_PX {
                assert_eq!(fb.pixel(x, y), Some(BinaryColor::Off), "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_report_lines_are_drawn() {
        let mut fb = FrameBuffer::new();
        draw_report(&summary(2_000_000, [0; BUCKET_COUNT]), &mut fb).unwrap();

        let text_pixels = (0..DISPLAY_WIDTH_PX)
            .flat_map(|x| (REPORT_TOP_PX..HISTOGRAM_TOP_PX).map(move |y| (x, y)))
            .filter(|&(x, y)| fb.pixel(x, y) == Some(BinaryColor::On))
            .count();
        assert!(text_pixels > 0, "report lines must be drawn");
    }

    #[test]
    fn test_saturated_totals_still_render_values() {
        let summary = Summary::new(
            2500,
            0,
            u64::MAX,
            6.6e25,
            2.4e23,
            [0; BUCKET_COUNT],
            LocalTime::new(40, 23, 59),
        );
        let mut fb = FrameBuffer::new();
        draw_report(&summary, &mut fb).unwrap();

        // "Cost: " takes six 5 px cells, the value starts after it
        let cost_top = REPORT_TOP_PX + 3 * LINE_HEIGHT_PX;
        let value_pixels = (30..DISPLAY_WIDTH_PX)
            .flat_map(|x| (cost_top..cost_top + LINE_HEIGHT_PX).map(move |y| (x, y)))
            .filter(|&(x, y)| fb.pixel(x, y) == Some(BinaryColor::On))
            .count();
        assert!(value_pixels > 0, "cost value must not be dropped");
    }

    #[test]
    fn test_report_replaces_previous_screen() {
        let mut fb = FrameBuffer::new();
        let mut histogram = [0; BUCKET_COUNT];
        histogram[19] = 1;
        draw_report(&summary(2500, histogram), &mut fb).unwrap();
        assert_eq!(fb.pixel(57, DISPLAY_HEIGHT_PX - 1), Some(BinaryColor::On));

        draw_status(LinkStatus::Subscribed, &mut fb).unwrap();
        assert_eq!(fb.pixel(57, DISPLAY_HEIGHT_PX - 1), Some(BinaryColor::Off));
        assert_eq!(fb.pixel(0, 0), Some(BinaryColor::Off));
        assert!(fb.lit_pixel_count() > 0, "status label must be drawn");
    }
}
