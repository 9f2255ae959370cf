//! Viewport-fitting layout for scroll regions, split tables and collapsible rows.
//!
//! The engine works on a mirrored [`box_tree::BoxTree`] and reads geometry
//! through the host's [`box_tree::Metrics`] capability. Every mutation it
//! makes is journaled on the tree for the host to replay.
//!
//! - [`LayoutEngine`]: owns the tree and all layout state, runs passes
//! - [`SplitGroup`]: a table split into independently scrolling sections
//! - [`collapse`]: pure row visibility rules plus the tree glue
//! - [`drive`]: async loop over host signals with coalesced resizes
#![allow(
    clippy::module_name_repetitions,
    reason = "Engine types are re-exported at the crate root"
)]

pub mod collapse;
pub mod columns;
mod config;
mod driver;
mod error;
mod orchestrator;
pub mod prepare;
mod scheduler;
mod scrollbar;
mod splitter;
mod viewport;

pub use config::{DEFAULT_DEBOUNCE_MS, LayoutConfig};
pub use driver::{DriveReport, HostSignal, drive};
pub use error::LayoutError;
pub use orchestrator::{LayoutEngine, PassOutcome, PassReport};
pub use scheduler::ResizeScheduler;
pub use scrollbar::{MIN_SCROLLBAR, ScrollbarMetric};
pub use splitter::{SplitEnv, SplitGroup, SplitSection};
pub use viewport::{Viewport, ViewportTracker, region_height, region_width};
