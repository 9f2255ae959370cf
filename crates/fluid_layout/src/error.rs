//! Engine error taxonomy.

use box_tree::BoxKey;
use thiserror::Error;

/// Failures surfaced by [`crate::LayoutEngine`] operations.
///
/// Only `NotCollapsible`, `UnknownBox` and `Tree` ever reach callers; the
/// other variants are degraded to skips inside a pass and reported through
/// logs and [`crate::PassOutcome`].
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("degenerate viewport {width}x{height}")]
    DegenerateViewport { width: i32, height: i32 },

    #[error("irregular grid {grid:?}: {reason}")]
    IrregularGrid { grid: BoxKey, reason: String },

    #[error("row {0:?} has no collapse level")]
    NotCollapsible(BoxKey),

    #[error("unknown box {0:?}")]
    UnknownBox(BoxKey),

    #[error("tree error: {0}")]
    Tree(#[from] anyhow::Error),
}
