//! Tracks what the panel should show and redraws only when it changes.

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use log::debug;

use crate::handler::{HandlerOutcome, LinkStatus};
use crate::render::{draw_report, draw_status};
use crate::summary::Summary;

/// Content currently assigned to the panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    /// Link progress message
    Status(LinkStatus),
    /// Daily usage report
    Report(Summary),
}

/// Owns the current [`Screen`] and its dirty flag.
///
/// ```rust,ignore
/// let mut display = DisplayManager::new();
///
/// display.apply(&handler.handle(&mut aggregator, event, now));
/// display.draw(&mut framebuffer)?;
/// framebuffer.flush(&mut panel)?;
/// ```
pub struct DisplayManager {
    screen: Screen,
    dirty: bool,
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    /// Start on the "Connecting" status screen
    pub fn new() -> Self {
        Self {
            screen: Screen::Status(LinkStatus::Connecting),
            dirty: true,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn show_status(&mut self, status: LinkStatus) {
        self.screen = Screen::Status(status);
        self.dirty = true;
    }

    pub fn show_report(&mut self, summary: Summary) {
        self.screen = Screen::Report(summary);
        self.dirty = true;
    }

    /// Switch screens according to a handler outcome.
    ///
    /// Returns `true` if the screen changed. Dropped payloads keep the
    /// current screen.
    pub fn apply(&mut self, outcome: &HandlerOutcome) -> bool {
        match outcome {
            HandlerOutcome::Status(status) => self.show_status(*status),
            HandlerOutcome::Report(summary) => self.show_report(*summary),
            HandlerOutcome::Dropped(_) => return false,
        }
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Draw the current screen if it changed since the last draw.
    ///
    /// Returns `true` if anything was drawn.
    pub fn draw<D>(&mut self, display: &mut D) -> Result<bool, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        if !self.dirty {
            return Ok(false);
        }

        match &self.screen {
            Screen::Status(status) => {
                debug!("Drawing status screen: {}", status.label());
                draw_status(*status, display)?;
            }
            Screen::Report(summary) => {
                debug!("Drawing report for {} W", summary.instant_watts);
                draw_report(summary, display)?;
            }
        }

        self.dirty = false;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{DailyAggregator, LocalTime};
    use crate::framebuffer::FrameBuffer;
    use crate::sample::{DecodeError, Sample};

    #[test]
    fn test_starts_dirty_on_connecting_screen() {
        let mut manager = DisplayManager::new();
        let mut fb = FrameBuffer::new();

        assert_eq!(manager.screen(), &Screen::Status(LinkStatus::Connecting));
        assert!(manager.is_dirty());
        assert_eq!(manager.draw(&mut fb), Ok(true));
        assert!(fb.lit_pixel_count() > 0);
        assert_eq!(manager.draw(&mut fb), Ok(false), "clean screen is not redrawn");
    }

    #[test]
    fn test_apply_outcomes() {
        let mut manager = DisplayManager::new();
        let mut fb = FrameBuffer::new();
        manager.draw(&mut fb).unwrap();

        assert!(manager.apply(&HandlerOutcome::Status(LinkStatus::Subscribed)));
        assert_eq!(manager.screen(), &Screen::Status(LinkStatus::Subscribed));
        assert!(manager.is_dirty());
        manager.draw(&mut fb).unwrap();

        let summary = DailyAggregator::new().ingest(Sample::new(1000, 640, 3), LocalTime::new(5, 6, 7));
        assert!(manager.apply(&HandlerOutcome::Report(summary)));
        assert_eq!(manager.screen(), &Screen::Report(summary));
        manager.draw(&mut fb).unwrap();

        assert!(!manager.apply(&HandlerOutcome::Dropped(DecodeError::MalformedJson)));
        assert_eq!(manager.screen(), &Screen::Report(summary), "dropped payloads keep the report");
        assert!(!manager.is_dirty());
    }

    #[test]
    fn test_mark_dirty_forces_redraw() {
        let mut manager = DisplayManager::new();
        let mut fb = FrameBuffer::new();
        manager.draw(&mut fb).unwrap();

        manager.mark_dirty();
        assert_eq!(manager.draw(&mut fb), Ok(true));
    }
}
