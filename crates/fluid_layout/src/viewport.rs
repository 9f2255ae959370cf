//! Usable viewport tracking and the viewport-relative sizing formulas.

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use box_tree::{Percent, Size};

/// Usable viewport in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    /// Whether the viewport is too small to lay anything out.
    pub const fn is_degenerate(self) -> bool {
        self.width <= 1 || self.height <= 1
    }
}

/// Tracks the usable viewport given reserved chrome and scrollbar allowance.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    reserved_width: i32,
    reserved_height: i32,
    current: Viewport,
}

impl ViewportTracker {
    pub const fn new(config: &LayoutConfig) -> Self {
        Self {
            reserved_width: config.reserved_width,
            reserved_height: config.reserved_height,
            current: Viewport {
                width: 0,
                height: 0,
            },
        }
    }

    /// Recompute the usable viewport from the window size.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DegenerateViewport`] when either dimension is at
    /// most one pixel. The degenerate value is still recorded.
    pub fn refresh(
        &mut self,
        window: Size,
        scrollbar: i32,
        horizontal_scroll: bool,
    ) -> Result<Viewport, LayoutError> {
        let allowance = if horizontal_scroll { scrollbar } else { 0 };
        let viewport = Viewport {
            width: window.width.floor() as i32 - self.reserved_width,
            height: window.height.floor() as i32 - self.reserved_height - 1 - allowance,
        };
        self.current = viewport;
        if viewport.is_degenerate() {
            return Err(LayoutError::DegenerateViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(viewport)
    }

    /// Viewport computed by the last refresh.
    pub const fn current(&self) -> Viewport {
        self.current
    }
}

/// Height of a scroll region: its share of the viewport left below `top`.
///
/// `scrollbar_extra` is added back when a horizontal scrollbar was reserved,
/// `chrome` is the box's outer height while its own height is zero.
pub fn region_height(
    viewport_height: i32,
    top: i32,
    share: Percent,
    scrollbar_extra: i32,
    chrome: i32,
) -> i32 {
    let available = ((viewport_height - top) * i32::from(share.get())).div_euclid(100);
    (available + scrollbar_extra - chrome - 1).max(0)
}

/// Width of a scroll region: its share of the viewport left right of `left`.
pub fn region_width(viewport_width: i32, left: f32, share: Percent, chrome: i32) -> i32 {
    let available = ((viewport_width as f32 - left) * f32::from(share.get()) / 100.0).floor() as i32;
    (available - chrome).max(0)
}
