//! Host measurement capability.

use crate::{BoxKey, BoxTree};

/// A measured size in (possibly fractional) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Size {
    /// Create a size.
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Offset of a box's outer edge relative to the document.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    /// Distance from the document's left edge.
    pub left: f32,
    /// Distance from the document's top edge.
    pub top: f32,
}

/// Edge sizes (top, right, bottom, left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeSizes {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl EdgeSizes {
    /// Create edge sizes with all edges set to the same value.
    pub const fn uniform(size: i32) -> Self {
        Self {
            top: size,
            right: size,
            bottom: size,
            left: size,
        }
    }

    /// Create edge sizes from individual values.
    pub const fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Left + right.
    pub const fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    /// Top + bottom.
    pub const fn vertical(&self) -> i32 {
        self.top + self.bottom
    }
}

/// Result of the off-screen scrollbar probe.
///
/// The host renders a fixed-size probe box, reads its content width, enables
/// scrolling and reads the client width again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollbarProbe {
    /// Content width without scrollbars.
    pub plain_width: f32,
    /// Client width once the scroll affordance appears.
    pub scrolling_width: f32,
}

/// The host's box measurement capability.
///
/// Implementations answer for the tree's current state: every style or
/// structural change the engine made before the call must be reflected.
pub trait Metrics {
    /// Inner size of the window.
    fn window_size(&self) -> Size;

    /// Outer size including padding, borders and margins; zero for undisplayed boxes.
    fn outer_size(&self, tree: &BoxTree, key: BoxKey) -> Size;

    /// Content-box size.
    fn content_size(&self, tree: &BoxTree, key: BoxKey) -> Size;

    /// Offset of the box relative to the document.
    fn offset(&self, tree: &BoxTree, key: BoxKey) -> Offset;

    /// Run the scrollbar probe.
    fn probe_scrollbar(&mut self) -> ScrollbarProbe;
}
