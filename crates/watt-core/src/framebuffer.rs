//! Packed 1 bpp framebuffer in SSD1306 page layout.
//!
//! The controller addresses the 128x64 panel as 8 pages of 128 column bytes,
//! one bit per row, least significant bit on top. The panel is mounted rotated,
//! so screens draw in portrait coordinates (64 wide, 128 tall) and this buffer
//! maps them onto the physical pages:
//!
//! ```text
//! portrait (x, y)  ->  panel column = y, panel row = 63 - x
//! ```
//!
//! A portrait column band 8 pixels wide therefore lives in exactly one page.
//! Each page carries a dirty flag and flushing sends whole dirty pages only.

use core::convert::Infallible;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::debug;

use crate::render::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX};

/// Column bytes per page (the panel's long edge)
pub const PAGE_WIDTH: usize = DISPLAY_HEIGHT_PX as usize;

/// Pages on the panel, 8 rows each
pub const PAGE_COUNT: usize = DISPLAY_WIDTH_PX as usize / 8;

/// Portrait columns covered by one page
const PAGE_BAND_PX: i32 = 8;

const BUFFER_LEN: usize = PAGE_WIDTH * PAGE_COUNT;

const _: () = assert!(PAGE_COUNT <= u8::BITS as usize);

/// Monochrome framebuffer implementing `DrawTarget<Color = BinaryColor>`.
///
/// 1 KiB, so it lives inline rather than on the heap.
pub struct FrameBuffer {
    bytes: [u8; BUFFER_LEN],
    /// Bit `n` set when page `n` changed since it was last flushed
    dirty_pages: u8,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte index and bit mask of a portrait pixel, `None` outside the panel.
fn locate(x: i32, y: i32) -> Option<(usize, u8)> {
    if x < 0 || y < 0 || x >= DISPLAY_WIDTH_PX || y >= DISPLAY_HEIGHT_PX {
        return None;
    }
    let row = (DISPLAY_WIDTH_PX - 1 - x) as usize;
    Some(((row / 8) * PAGE_WIDTH + y as usize, 1 << (row % 8)))
}

/// Portrait area drawn by page `page`.
fn page_area(page: usize) -> Rectangle {
    let left = DISPLAY_WIDTH_PX - PAGE_BAND_PX * (page as i32 + 1);
    Rectangle::new(
        Point::new(left, 0),
        Size::new(PAGE_BAND_PX as u32, DISPLAY_HEIGHT_PX as u32),
    )
}

impl FrameBuffer {
    /// A blank, clean framebuffer
    pub const fn new() -> Self {
        Self {
            bytes: [0; BUFFER_LEN],
            dirty_pages: 0,
        }
    }

    /// Read back a pixel, `None` outside the panel.
    pub fn pixel(&self, x: i32, y: i32) -> Option<BinaryColor> {
        let (idx, mask) = locate(x, y)?;
        Some(BinaryColor::from(self.bytes[idx] & mask != 0))
    }

    /// Raw column bytes of one page, as the controller expects them
    pub fn page(&self, page: usize) -> Option<&[u8]> {
        self.bytes.chunks_exact(PAGE_WIDTH).nth(page)
    }

    /// Whether anything changed since the last flush
    pub fn is_dirty(&self) -> bool {
        self.dirty_pages != 0
    }

    pub fn is_page_dirty(&self, page: usize) -> bool {
        page < PAGE_COUNT && self.dirty_pages & (1 << page) != 0
    }

    /// Number of pixels currently on
    pub fn lit_pixel_count(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: BinaryColor) {
        let Some((idx, mask)) = locate(x, y) else {
            return;
        };
        let old = self.bytes[idx];
        let new = if color.is_on() { old | mask } else { old & !mask };
        if new != old {
            self.bytes[idx] = new;
            self.dirty_pages |= 1 << (idx / PAGE_WIDTH);
        }
    }

    /// Hand each dirty page to `write_page` as raw controller bytes.
    ///
    /// A page stays dirty if writing it fails, so the next flush retries it.
    pub fn flush_pages<E>(
        &mut self,
        mut write_page: impl FnMut(u8, &[u8]) -> Result<(), E>,
    ) -> Result<(), E> {
        for (page, bytes) in self.bytes.chunks_exact(PAGE_WIDTH).enumerate() {
            let bit = 1 << page;
            if self.dirty_pages & bit == 0 {
                continue;
            }
            write_page(page as u8, bytes)?;
            self.dirty_pages &= !bit;
        }
        Ok(())
    }

    /// Copy every dirty page to a portrait `DrawTarget`, one 8 px band each.
    pub fn flush<D>(&mut self, display: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        if self.dirty_pages == 0 {
            return Ok(());
        }
        debug!("Flushing dirty pages {:08b}", self.dirty_pages);

        for page in 0..PAGE_COUNT {
            let bit = 1 << page;
            if self.dirty_pages & bit == 0 {
                continue;
            }

            let area = page_area(page);
            let bytes = &self.bytes[page * PAGE_WIDTH..(page + 1) * PAGE_WIDTH];
            let left = area.top_left.x;
            let colors = (0..DISPLAY_HEIGHT_PX).flat_map(move |y| {
                (left..left + PAGE_BAND_PX).map(move |x| {
                    let row = (DISPLAY_WIDTH_PX - 1 - x) as usize % 8;
                    BinaryColor::from(bytes[y as usize] & (1 << row) != 0)
                })
            });
            display.fill_contiguous(&area, colors)?;
            self.dirty_pages &= !bit;
        }
        Ok(())
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX as u32, DISPLAY_HEIGHT_PX as u32)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            self.set_pixel(coord.x, coord.y, color);
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        for y in area.top_left.y..=bottom_right.y {
            for x in area.top_left.x..=bottom_right.x {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let fill = if color.is_on() { 0xff } else { 0x00 };
        for (page, bytes) in self.bytes.chunks_exact_mut(PAGE_WIDTH).enumerate() {
            if bytes.iter().any(|&b| b != fill) {
                bytes.fill(fill);
                self.dirty_pages |= 1 << page;
            }
        }
        Ok(())
    }
}
