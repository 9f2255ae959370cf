//! The layout engine and its resize pass.
//!
//! A full pass runs three phases over the whole tree, each completing before
//! the next starts:
//! 1. resync every split group against the current viewport,
//! 2. shrink every managed dimension of every scroll region to zero,
//! 3. measure and apply, top-down, so ancestors are sized before their
//!    descendants are measured.

use crate::collapse::{hide_rows, toggle_rows};
use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::prepare::{
    add_collapse_controls, grids_in, initially_hidden_rows, remove_empty_rows, reverse_rows,
};
use crate::scheduler::ResizeScheduler;
use crate::scrollbar::ScrollbarMetric;
use crate::splitter::{SplitEnv, SplitGroup};
use crate::viewport::{Viewport, ViewportTracker, region_height, region_width};
use box_tree::{
    BoxKey, BoxKind, BoxTree, CollapseState, Metrics, Overflow, ScrollAxis, ScrollRegion,
    SectionRole, SplitGroupId, SplitRole, TreeSubscriber as _, TreeUpdate,
};
use log::{debug, trace, warn};
use std::time::Instant;
use tracing::info_span;

/// Counters describing one completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Viewport the pass was applied against.
    pub viewport: Viewport,
    /// Grids split by a conversion deferred from an earlier, unusable viewport.
    pub converted_groups: usize,
    pub resynced_groups: usize,
    /// Groups whose resync failed and were left as they were.
    pub failed_groups: usize,
    /// Scroll regions whose dimensions were zeroed.
    pub shrunk: usize,
    /// Scroll regions that received new dimensions.
    pub sized: usize,
    /// Boxes skipped because applying their sizes failed.
    pub failed_boxes: usize,
    pub horizontal_scroll: bool,
}

/// Result of [`LayoutEngine::run_full_layout_pass`].
#[derive(Debug)]
pub enum PassOutcome {
    /// The pass did not run; retried on the next trigger.
    Skipped(LayoutError),
    Completed(PassReport),
}

impl PassOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub const fn report(&self) -> Option<&PassReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped(_) => None,
        }
    }
}

/// Viewport-relative sizing, table splitting and row collapse over one tree.
///
/// The engine owns the mirrored tree, the host's measurement capability and
/// all process-wide state: viewport, scrollbar thickness and split groups.
#[derive(Debug)]
pub struct LayoutEngine<M: Metrics> {
    tree: BoxTree,
    metrics: M,
    config: LayoutConfig,
    viewport: ViewportTracker,
    scrollbar: ScrollbarMetric,
    groups: Vec<SplitGroup>,
    next_group: u32,
    /// Whether some split group overflowed horizontally on the last resync.
    horizontal_scroll: bool,
    /// Conversion scope waiting for a usable viewport.
    pending_conversion: Option<BoxKey>,
    scheduler: ResizeScheduler,
}

impl<M: Metrics> LayoutEngine<M> {
    /// Create an engine without touching the tree.
    pub fn new(tree: BoxTree, metrics: M, config: LayoutConfig) -> Self {
        let viewport = ViewportTracker::new(&config);
        let scheduler = ResizeScheduler::new(config.resize_debounce());
        Self {
            tree,
            metrics,
            config,
            viewport,
            scrollbar: ScrollbarMetric::new(),
            groups: Vec::new(),
            next_group: 0,
            horizontal_scroll: false,
            pending_conversion: None,
            scheduler,
        }
    }

    /// Create an engine and prepare the tree: reverse marked grids, drop empty
    /// rows, inject collapse controls, split marked grids, apply initial
    /// collapse states and run a first pass.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Tree`] when a preparation step cannot mutate the
    /// tree. Layout problems never fail initialization.
    pub fn initialize(
        tree: BoxTree,
        metrics: M,
        config: LayoutConfig,
    ) -> Result<Self, LayoutError> {
        let mut engine = Self::new(tree, metrics, config);
        let _span = info_span!("layout.initialize").entered();

        let scrollbar = engine.scrollbar.measure(&mut engine.metrics);
        let window = engine.metrics.window_size();
        if let Err(err) = engine.viewport.refresh(window, scrollbar, false) {
            debug!("Initial viewport unusable: {err}");
        }

        let root = engine.tree.root();
        reverse_rows(&mut engine.tree, root)?;
        remove_empty_rows(&mut engine.tree, root)?;
        add_collapse_controls(&mut engine.tree, root)?;
        engine.convert_marked_grids(None)?;
        for row in initially_hidden_rows(&engine.tree, root) {
            if let Err(err) = hide_rows(&mut engine.tree, row) {
                warn!("Failed to apply initial collapse of {row:?}: {err}");
            }
        }

        if let PassOutcome::Skipped(err) = engine.run_full_layout_pass() {
            debug!("Initial layout pass skipped: {err}");
        }
        Ok(engine)
    }

    /// Split every scroll-marked grid under `scope` that is not split yet.
    ///
    /// Returns the number of new split groups. Already split grids and the
    /// auxiliary grids of existing groups are left alone, so calling this
    /// twice changes nothing the second time. With an unusable viewport the
    /// conversion is deferred to the next pass that has one.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownBox`] when `scope` is not in the tree.
    pub fn convert_marked_grids(&mut self, scope: Option<BoxKey>) -> Result<usize, LayoutError> {
        let scope = scope.unwrap_or_else(|| self.tree.root());
        if !self.tree.contains(scope) {
            return Err(LayoutError::UnknownBox(scope));
        }
        let _span = info_span!("layout.convert").entered();

        let scrollbar = self.scrollbar.measure(&mut self.metrics);
        let window = self.metrics.window_size();
        let viewport = match self.viewport.refresh(window, scrollbar, self.horizontal_scroll) {
            Ok(viewport) => viewport,
            Err(err) => {
                debug!("Deferring grid conversion under {scope:?}: {err}");
                self.pending_conversion = match self.pending_conversion {
                    Some(pending) if pending != scope => Some(self.tree.root()),
                    _ => Some(scope),
                };
                return Ok(0);
            }
        };
        let env = SplitEnv {
            viewport,
            scrollbar,
            compensate: self.scrollbar.needs_compensation(),
        };

        let candidates: Vec<BoxKey> = grids_in(&self.tree, scope)
            .into_iter()
            .filter(|grid| {
                self.tree.get(*grid).is_some_and(|node| {
                    node.descriptor.split.is_none() && node.descriptor.scroll.is_marked()
                })
            })
            .collect();

        let mut converted = 0;
        for grid in candidates {
            let id = SplitGroupId(self.next_group);
            match SplitGroup::construct(&mut self.tree, &self.metrics, grid, id, env) {
                Ok(group) => {
                    self.next_group += 1;
                    self.groups.push(group);
                    converted += 1;
                }
                Err(err) => warn!("Failed to split grid {grid:?}: {err}"),
            }
        }
        if converted > 0 {
            debug!("Converted {converted} grids into split groups");
        }
        Ok(converted)
    }

    /// Run resync, shrink and apply immediately, bypassing coalescing.
    pub fn run_full_layout_pass(&mut self) -> PassOutcome {
        let _span = info_span!("layout.pass").entered();
        let tree = &self.tree;
        self.groups
            .retain(|group| tree.contains(group.frame()) && tree.contains(group.source()));

        let scrollbar = self.scrollbar.measure(&mut self.metrics);
        let window = self.metrics.window_size();
        let viewport = match self.viewport.refresh(window, scrollbar, self.horizontal_scroll) {
            Ok(viewport) => viewport,
            Err(err) => {
                debug!("Skipping layout pass: {err}");
                return PassOutcome::Skipped(err);
            }
        };

        let mut report = PassReport::default();
        if let Some(scope) = self.pending_conversion.take() {
            match self.convert_marked_grids(Some(scope)) {
                Ok(converted) => report.converted_groups = converted,
                Err(err) => warn!("Failed deferred grid conversion under {scope:?}: {err}"),
            }
        }
        self.resync_groups(viewport, scrollbar, &mut report);

        let viewport = match self.viewport.refresh(window, scrollbar, self.horizontal_scroll) {
            Ok(viewport) => viewport,
            Err(err) => {
                debug!("Skipping layout pass after resync: {err}");
                return PassOutcome::Skipped(err);
            }
        };
        report.viewport = viewport;
        report.horizontal_scroll = self.horizontal_scroll;

        let order = render_order(&self.tree);
        self.shrink_pass(&order, &mut report);
        self.apply_pass(&order, viewport, scrollbar, &mut report);

        trace!("Layout pass finished: {report:?}");
        PassOutcome::Completed(report)
    }

    fn resync_groups(&mut self, viewport: Viewport, scrollbar: i32, report: &mut PassReport) {
        let _span = info_span!("layout.resync").entered();
        let env = SplitEnv {
            viewport,
            scrollbar,
            compensate: self.scrollbar.needs_compensation(),
        };
        let mut overflow = false;
        for group in &mut self.groups {
            match group.resync(&mut self.tree, &self.metrics, env) {
                Ok(clamped) => {
                    overflow |= clamped;
                    report.resynced_groups += 1;
                }
                Err(err) => {
                    warn!("Failed to resync split group {:?}: {err}", group.id());
                    report.failed_groups += 1;
                }
            }
        }
        self.horizontal_scroll = overflow;
    }

    fn shrink_pass(&mut self, order: &[BoxKey], report: &mut PassReport) {
        let _span = info_span!("layout.shrink").entered();
        for key in order {
            let Some((region, split_frame)) = scroll_region(&self.tree, *key) else {
                continue;
            };
            let shrunk = self.tree.update_style(*key, |style| {
                if !region.height.is_zero() {
                    style.height = Some(0);
                }
                if !region.width.is_zero() && !split_frame {
                    style.width = Some(0);
                }
            });
            match shrunk {
                Ok(_) => report.shrunk += 1,
                Err(err) => {
                    warn!("Failed to shrink {key:?}: {err}");
                    report.failed_boxes += 1;
                }
            }
        }
    }

    fn apply_pass(
        &mut self,
        order: &[BoxKey],
        viewport: Viewport,
        scrollbar: i32,
        report: &mut PassReport,
    ) {
        let _span = info_span!("layout.apply").entered();
        for key in order {
            let Some((region, split_frame)) = scroll_region(&self.tree, *key) else {
                continue;
            };
            if !self.tree.is_displayed(*key) {
                trace!("Not sizing undisplayed box {key:?}");
                continue;
            }
            match self.apply_box(*key, region, split_frame, viewport, scrollbar) {
                Ok(()) => report.sized += 1,
                Err(err) => {
                    warn!("Failed to size {key:?}: {err}");
                    report.failed_boxes += 1;
                }
            }
        }
    }

    /// Size one scroll region from its current offset and chrome.
    fn apply_box(
        &mut self,
        key: BoxKey,
        region: ScrollRegion,
        split_frame: bool,
        viewport: Viewport,
        scrollbar: i32,
    ) -> Result<(), LayoutError> {
        if !split_frame {
            self.tree.update_style(key, |style| match region.axis {
                ScrollAxis::Vertical => style.overflow = Overflow::AutoY,
                ScrollAxis::Both => {
                    style.overflow = Overflow::AutoX;
                    style.flex_row = true;
                }
            })?;
        }

        let scrollbar_extra = if self.horizontal_scroll { scrollbar } else { 0 };
        let mut height = None;
        if !region.height.is_zero() {
            let top = self.metrics.offset(&self.tree, key).top.ceil() as i32;
            let chrome = self.metrics.outer_size(&self.tree, key).height.ceil() as i32;
            let resolved =
                region_height(viewport.height, top, region.height, scrollbar_extra, chrome);
            self.tree.update_style(key, |style| style.height = Some(resolved))?;
            height = Some(resolved);
        }

        if split_frame {
            let group = self
                .group_for_frame(key)
                .ok_or(LayoutError::UnknownBox(key))?;
            let width = (group.grid_width() + scrollbar).min(viewport.width);
            let header = group.section(SectionRole::Header).map(|section| section.wrapper);
            let footer = group.section(SectionRole::Footer).map(|section| section.wrapper);
            let body = group.section(SectionRole::Body).copied();
            self.tree.update_style(key, |style| style.width = Some(width))?;

            if let (Some(frame_height), Some(body)) = (height, body) {
                let pinned: i32 = [header, footer]
                    .into_iter()
                    .flatten()
                    .map(|wrapper| {
                        self.metrics.outer_size(&self.tree, wrapper).height.ceil() as i32
                    })
                    .sum();
                let natural = self.metrics.outer_size(&self.tree, body.grid).height.ceil() as i32;
                let body_height = (frame_height - scrollbar_extra - pinned - 1).max(0).min(natural);
                self.tree
                    .update_style(body.wrapper, |style| style.height = Some(body_height))?;
            }
        } else if !region.width.is_zero() {
            let left = self.metrics.offset(&self.tree, key).left;
            let chrome = self.metrics.outer_size(&self.tree, key).width.ceil() as i32;
            let width =
                region_width(viewport.width, left, region.width, chrome).min(viewport.width);
            self.tree.update_style(key, |style| style.width = Some(width))?;
        }
        Ok(())
    }

    fn group_for_frame(&self, frame: BoxKey) -> Option<&SplitGroup> {
        self.groups.iter().find(|group| group.frame() == frame)
    }

    /// Request a coalesced pass; a still pending one is superseded.
    pub fn trigger_resize(&mut self, now: Instant) {
        trace!("Resize requested");
        self.scheduler.request(now);
    }

    /// Run the coalesced pass if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<PassOutcome> {
        self.scheduler
            .take_due(now)
            .then(|| self.run_full_layout_pass())
    }

    /// When the pending coalesced pass is due, if one is pending.
    pub const fn resize_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    /// Toggle a collapsible row, then relayout.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::NotCollapsible`] for rows without a collapse
    /// level and [`LayoutError::UnknownBox`] for keys not in the tree.
    pub fn toggle_row(&mut self, row: BoxKey) -> Result<CollapseState, LayoutError> {
        let _span = info_span!("layout.toggle", row = row.0).entered();
        if self.tree.kind(row) != Some(BoxKind::Row) {
            return Err(if self.tree.contains(row) {
                LayoutError::NotCollapsible(row)
            } else {
                LayoutError::UnknownBox(row)
            });
        }
        let state = toggle_rows(&mut self.tree, row)?;
        if let PassOutcome::Skipped(err) = self.run_full_layout_pass() {
            debug!("Layout after toggle skipped: {err}");
        }
        Ok(state)
    }

    /// Route a click: a click inside a collapse control cell toggles its row.
    ///
    /// Returns the row's new state, or `None` when the click hit anything else.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownBox`] when `target` is not in the tree.
    pub fn handle_click(&mut self, target: BoxKey) -> Result<Option<CollapseState>, LayoutError> {
        let node = self.tree.get(target).ok_or(LayoutError::UnknownBox(target))?;
        let cell = if node.kind == BoxKind::Cell {
            Some(target)
        } else {
            self.tree.ancestor_of_kind(target, BoxKind::Cell)
        };
        let Some(cell) = cell else {
            return Ok(None);
        };
        if !self.tree.get(cell).is_some_and(|found| found.descriptor.collapse_control) {
            return Ok(None);
        }
        let Some(row) = self.tree.parent(cell) else {
            return Ok(None);
        };
        let collapsible = self.tree.get(row).is_some_and(|found| {
            found.kind == BoxKind::Row && found.descriptor.collapse_level.is_some()
        });
        if !collapsible {
            return Ok(None);
        }
        self.toggle_row(row).map(Some)
    }

    /// Ingest host updates into the mirrored tree.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Tree`] for the first update that cannot be applied.
    pub fn apply_updates(&mut self, updates: Vec<TreeUpdate>) -> Result<(), LayoutError> {
        let count = updates.len();
        self.tree.apply_updates(updates)?;
        trace!("Applied {count} host updates");
        Ok(())
    }

    pub const fn tree(&self) -> &BoxTree {
        &self.tree
    }

    pub const fn tree_mut(&mut self) -> &mut BoxTree {
        &mut self.tree
    }

    pub const fn metrics(&self) -> &M {
        &self.metrics
    }

    pub const fn metrics_mut(&mut self) -> &mut M {
        &mut self.metrics
    }

    pub const fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Viewport computed by the last refresh.
    pub const fn viewport(&self) -> Viewport {
        self.viewport.current()
    }

    /// Measured scrollbar thickness, 0 before the first measurement.
    pub fn scrollbar_thickness(&self) -> i32 {
        self.scrollbar.thickness()
    }

    pub fn split_groups(&self) -> &[SplitGroup] {
        &self.groups
    }

    pub const fn horizontal_scroll(&self) -> bool {
        self.horizontal_scroll
    }

    /// Drain the journal of tree mutations for replay on the host.
    pub fn take_changes(&mut self) -> Vec<TreeUpdate> {
        self.tree.take_changes()
    }

    /// Resize requests that replaced a still pending one.
    pub const fn superseded_resizes(&self) -> u64 {
        self.scheduler.superseded()
    }
}

/// The scroll region of a box and whether it is a split frame.
fn scroll_region(tree: &BoxTree, key: BoxKey) -> Option<(ScrollRegion, bool)> {
    let node = tree.get(key)?;
    let region = node.descriptor.scroll.region(node.kind)?;
    let split_frame = node
        .descriptor
        .split
        .is_some_and(|membership| membership.role == SplitRole::Frame);
    Some((region, split_frame))
}

/// Rendered boxes in pre-order; non-rendering subtrees are not entered.
fn render_order(tree: &BoxTree) -> Vec<BoxKey> {
    let mut order = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(key) = stack.pop() {
        if tree.kind(key).is_some_and(|kind| !kind.is_rendered()) {
            continue;
        }
        order.push(key);
        stack.extend(tree.children(key).iter().rev().copied());
    }
    order
}
