//! Inline dimension styles written by the engine.

use core::fmt;

/// Overflow handling of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Overflow {
    /// Content overflows visibly.
    #[default]
    Visible,
    /// Content is clipped on both axes.
    Hidden,
    /// Vertical scrollbar when needed.
    AutoY,
    /// Vertical scrollbar always present.
    ScrollY,
    /// Horizontal scrollbar when needed, vertical overflow clipped.
    AutoX,
}

/// The subset of inline style the engine manages. Dimensions are content-box pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InlineStyle {
    /// Declared width, `None` for auto.
    pub width: Option<i32>,
    /// Declared minimum width.
    pub min_width: Option<i32>,
    /// Declared height, `None` for auto.
    pub height: Option<i32>,
    /// `display: none`.
    pub hidden: bool,
    /// Overflow mode.
    pub overflow: Overflow,
    /// Children laid out as a non-wrapping flex row.
    pub flex_row: bool,
}

impl fmt::Display for InlineStyle {
    /// Serialize as a CSS declaration list for the host's `style` attribute.
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(width) = self.width {
            write!(formatter, "width: {width}px; ")?;
        }
        if let Some(min_width) = self.min_width {
            write!(formatter, "min-width: {min_width}px; ")?;
        }
        if let Some(height) = self.height {
            write!(formatter, "height: {height}px; ")?;
        }
        match self.overflow {
            Overflow::Visible => {}
            Overflow::Hidden => formatter.write_str("overflow: hidden; ")?,
            Overflow::AutoY => formatter.write_str("overflow-y: auto; ")?,
            Overflow::ScrollY => formatter.write_str("overflow-y: scroll; ")?,
            Overflow::AutoX => formatter.write_str("overflow-x: auto; overflow-y: hidden; ")?,
        }
        if self.hidden {
            formatter.write_str("display: none;")
        } else if self.flex_row {
            formatter.write_str("display: flex; flex-direction: row; flex-wrap: nowrap;")
        } else {
            Ok(())
        }
    }
}
