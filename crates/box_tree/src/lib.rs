//! Typed visual box tree shared between a host document and the fluid layout engine.
//!
//! This crate provides:
//! - `BoxKey`: stable keys correlating host nodes with engine-side boxes
//! - `BoxTree`: the mirrored tree with typed descriptors and inline styles
//! - `TreeUpdate`/`TreeSubscriber`: the mirror protocol in both directions
//! - `Metrics`: the host measurement capability the engine reads geometry from
//! - `FlowMetrics`: a deterministic headless implementation of `Metrics`
#![allow(
    clippy::module_name_repetitions,
    reason = "Tree types are re-exported at the crate root"
)]

mod descriptor;
mod flow;
mod metrics;
mod style;
mod tree;

pub use descriptor::{
    BoxDescriptor, BoxKind, CollapseDirection, CollapseMarker, CollapseState, MAX_COLSPAN,
    MAX_ROWSPAN, Percent, ScrollAxis, ScrollMarkers, ScrollRegion, SectionRole, SplitGroupId,
    SplitMembership, SplitRole,
};
pub use flow::FlowMetrics;
pub use metrics::{EdgeSizes, Metrics, Offset, ScrollbarProbe, Size};
pub use style::{InlineStyle, Overflow};
pub use tree::{BoxNode, BoxTree, TreeSubscriber, TreeUpdate};

/// A 64-bit stable key for boxes, shared with the host document.
///
/// Keys at or above [`BoxKey::MINTED_BASE`] are minted by the engine for boxes
/// it creates itself (split wrappers, synchronization rows, control cells), so
/// they never collide with keys handed in by the host.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct BoxKey(pub u64);

impl BoxKey {
    /// The document root (always present).
    pub const ROOT: Self = Self(0);
    /// First key of the engine-minted range.
    pub const MINTED_BASE: u64 = 1 << 63;

    /// Whether this key was minted by the engine rather than the host.
    #[inline]
    pub const fn is_minted(self) -> bool {
        self.0 >= Self::MINTED_BASE
    }
}
