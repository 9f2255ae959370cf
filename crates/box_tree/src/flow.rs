//! Deterministic headless geometry.
//!
//! `FlowMetrics` answers [`Metrics`] queries from the tree alone: block boxes
//! stack vertically, rows and flex rows stack horizontally, grids use a
//! column model with row/column spans, and undisplayed boxes take no space.
//! Leaf content sizes and edge sizes (margin + border + padding) are supplied
//! per box by the caller.

use crate::descriptor::BoxKind;
use crate::metrics::{EdgeSizes, Metrics, Offset, ScrollbarProbe, Size};
use crate::{BoxKey, BoxTree};
use log::trace;
use std::collections::HashMap;

/// Scrollbar thickness reported by the probe unless overridden.
const DEFAULT_SCROLLBAR: f32 = 15.0;
/// Outer width of the probe box.
const PROBE_WIDTH: f32 = 200.0;

/// Resolved column layout of one grid.
#[derive(Debug, Default)]
struct GridModel {
    /// Outer width of each column.
    columns: Vec<i32>,
    /// Start column and span of each placed cell.
    placements: HashMap<BoxKey, (usize, usize)>,
}

impl GridModel {
    fn total(&self) -> i32 {
        self.columns.iter().sum()
    }

    fn span_width(&self, start: usize, span: usize) -> i32 {
        self.columns.iter().skip(start).take(span).sum()
    }
}

/// Headless [`Metrics`] implementation.
#[derive(Debug, Clone)]
pub struct FlowMetrics {
    window: Size,
    scrollbar: f32,
    intrinsic: HashMap<BoxKey, (i32, i32)>,
    edges: HashMap<BoxKey, EdgeSizes>,
}

impl FlowMetrics {
    /// Create metrics for a window of the given inner size.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            window: Size::new(width, height),
            scrollbar: DEFAULT_SCROLLBAR,
            intrinsic: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    /// Override the scrollbar thickness the probe reports (0 models overlay scrollbars).
    #[must_use]
    pub fn with_scrollbar(mut self, thickness: f32) -> Self {
        self.scrollbar = thickness;
        self
    }

    /// Resize the window.
    pub fn set_window(&mut self, width: f32, height: f32) {
        self.window = Size::new(width, height);
    }

    /// Set the intrinsic content size of a box (text, images, fixed content).
    pub fn set_intrinsic(&mut self, key: BoxKey, width: i32, height: i32) {
        self.intrinsic.insert(key, (width, height));
    }

    /// Set the combined margin, border and padding of a box.
    pub fn set_edges(&mut self, key: BoxKey, edges: EdgeSizes) {
        self.edges.insert(key, edges);
    }

    fn edges_of(&self, key: BoxKey) -> EdgeSizes {
        self.edges.get(&key).copied().unwrap_or_default()
    }

    fn intrinsic_of(&self, key: BoxKey) -> (i32, i32) {
        self.intrinsic.get(&key).copied().unwrap_or_default()
    }

    fn outer_width(&self, tree: &BoxTree, key: BoxKey) -> i32 {
        if !tree.is_displayed(key) {
            return 0;
        }
        self.content_width(tree, key) + self.edges_of(key).horizontal()
    }

    fn outer_height(&self, tree: &BoxTree, key: BoxKey) -> i32 {
        if !tree.is_displayed(key) {
            return 0;
        }
        self.content_height(tree, key) + self.edges_of(key).vertical()
    }

    /// Width the box would take with its children at their natural widths.
    fn natural_width(&self, tree: &BoxTree, key: BoxKey, flex_row: bool) -> i32 {
        let children = tree
            .children(key)
            .iter()
            .map(|child| self.outer_width(tree, *child));
        let from_children = if flex_row {
            children.sum()
        } else {
            children.max().unwrap_or(0)
        };
        from_children.max(self.intrinsic_of(key).0)
    }

    fn natural_height(&self, tree: &BoxTree, key: BoxKey, flex_row: bool) -> i32 {
        let children = tree
            .children(key)
            .iter()
            .map(|child| self.outer_height(tree, *child));
        let from_children = if flex_row {
            children.max().unwrap_or(0)
        } else {
            children.sum()
        };
        from_children.max(self.intrinsic_of(key).1)
    }

    fn content_width(&self, tree: &BoxTree, key: BoxKey) -> i32 {
        let Some(node) = tree.get(key) else {
            return 0;
        };
        let style = node.style;
        let width = match node.kind {
            BoxKind::Grid => {
                let model = self.grid_model(tree, key);
                style.width.unwrap_or(0).max(model.total())
            }
            BoxKind::Section(_) | BoxKind::Row => {
                match tree.ancestor_of_kind(key, BoxKind::Grid) {
                    Some(grid) => self.grid_model(tree, grid).total(),
                    None => self.natural_width(tree, key, node.kind == BoxKind::Row),
                }
            }
            BoxKind::Cell => {
                let placed = tree.ancestor_of_kind(key, BoxKind::Grid).and_then(|grid| {
                    let model = self.grid_model(tree, grid);
                    model
                        .placements
                        .get(&key)
                        .map(|(start, span)| model.span_width(*start, *span))
                });
                match placed {
                    Some(outer) => (outer - self.edges_of(key).horizontal()).max(0),
                    None => self.natural_cell_width(tree, key),
                }
            }
            BoxKind::Text => self.intrinsic_of(key).0,
            _ => style
                .width
                .unwrap_or_else(|| self.natural_width(tree, key, style.flex_row)),
        };
        width.max(style.min_width.unwrap_or(0))
    }

    /// Content width a cell asks for before column resolution.
    fn natural_cell_width(&self, tree: &BoxTree, key: BoxKey) -> i32 {
        let style = tree.style(key);
        let natural = self.natural_width(tree, key, style.flex_row);
        natural
            .max(style.width.unwrap_or(0))
            .max(style.min_width.unwrap_or(0))
    }

    fn content_height(&self, tree: &BoxTree, key: BoxKey) -> i32 {
        let Some(node) = tree.get(key) else {
            return 0;
        };
        let style = node.style;
        match node.kind {
            BoxKind::Grid => {
                let rows: i32 = tree
                    .children(key)
                    .iter()
                    .map(|child| self.outer_height(tree, *child))
                    .sum();
                style.height.unwrap_or(0).max(rows)
            }
            BoxKind::Section(_) => self.natural_height(tree, key, false),
            BoxKind::Row => tree
                .children(key)
                .iter()
                .map(|cell| {
                    let rowspan = tree
                        .get(*cell)
                        .map_or(1, |found| found.descriptor.rowspan.max(1));
                    let height = self.outer_height(tree, *cell);
                    (height + rowspan as i32 - 1) / rowspan as i32
                })
                .max()
                .unwrap_or(0),
            BoxKind::Cell => self
                .natural_height(tree, key, style.flex_row)
                .max(style.height.unwrap_or(0)),
            BoxKind::Text => self.intrinsic_of(key).1,
            _ => style
                .height
                .unwrap_or_else(|| self.natural_height(tree, key, style.flex_row)),
        }
    }

    /// Build the column model of a grid from its visible rows, header first.
    fn grid_model(&self, tree: &BoxTree, grid: BoxKey) -> GridModel {
        let mut model = GridModel::default();
        let mut carried: Vec<u32> = Vec::new();
        let mut samples: Vec<(usize, usize, i32)> = Vec::new();

        for row in tree.grid_rows(grid) {
            if tree.style(row).hidden {
                continue;
            }
            let mut column = 0;
            for cell in tree.children(row).iter().copied() {
                let Some(node) = tree.get(cell) else {
                    continue;
                };
                if node.kind != BoxKind::Cell || node.style.hidden {
                    continue;
                }
                while carried.get(column).is_some_and(|rows| *rows > 0) {
                    column += 1;
                }
                let span = usize::try_from(node.descriptor.colspan.max(1)).unwrap_or(1);
                if carried.len() < column + span {
                    carried.resize(column + span, 0);
                }
                for slot in carried.iter_mut().skip(column).take(span) {
                    *slot = node.descriptor.rowspan.max(1);
                }
                let outer = self.natural_cell_width(tree, cell) + self.edges_of(cell).horizontal();
                samples.push((column, span, outer));
                model.placements.insert(cell, (column, span));
                column += span;
            }
            for slot in &mut carried {
                *slot = slot.saturating_sub(1);
            }
        }

        model.columns = vec![0; carried.len()];
        for (start, _, outer) in samples.iter().filter(|sample| sample.1 == 1) {
            if let Some(width) = model.columns.get_mut(*start) {
                *width = (*width).max(*outer);
            }
        }
        for (start, span, outer) in samples.iter().filter(|sample| sample.1 > 1) {
            let deficit = *outer - model.span_width(*start, *span);
            distribute(&mut model.columns, *start, *span, deficit);
        }

        let declared = tree.style(grid).width.unwrap_or(0);
        let count = model.columns.len();
        let extra = declared - model.total();
        if count > 0 && extra > 0 {
            distribute(&mut model.columns, 0, count, extra);
        }
        trace!("grid {grid:?} columns {:?}", model.columns);
        model
    }

    fn offset_of(&self, tree: &BoxTree, key: BoxKey) -> (i32, i32) {
        let Some(parent) = tree.parent(key) else {
            return (0, 0);
        };
        let (parent_left, parent_top) = self.offset_of(tree, parent);
        let parent_edges = self.edges_of(parent);
        let origin_left = parent_left + parent_edges.left;
        let origin_top = parent_top + parent_edges.top;

        let parent_kind = tree.kind(parent);
        if parent_kind == Some(BoxKind::Row) {
            let placed = tree.ancestor_of_kind(parent, BoxKind::Grid).and_then(|grid| {
                let model = self.grid_model(tree, grid);
                model
                    .placements
                    .get(&key)
                    .map(|(start, _)| model.span_width(0, *start))
            });
            if let Some(before) = placed {
                return (origin_left + before, origin_top);
            }
        }

        let preceding = tree
            .children(parent)
            .iter()
            .take_while(|sibling| **sibling != key);
        if parent_kind == Some(BoxKind::Row) || tree.style(parent).flex_row {
            let before: i32 = preceding.map(|sibling| self.outer_width(tree, *sibling)).sum();
            (origin_left + before, origin_top)
        } else {
            let before: i32 = preceding
                .map(|sibling| self.outer_height(tree, *sibling))
                .sum();
            (origin_left, origin_top + before)
        }
    }
}

/// Spread `extra` pixels evenly over `span` columns, remainder on the last one.
fn distribute(columns: &mut [i32], start: usize, span: usize, extra: i32) {
    if extra <= 0 || span == 0 {
        return;
    }
    let span_i32 = span as i32;
    let share = extra / span_i32;
    let remainder = extra % span_i32;
    let last = start + span - 1;
    for (index, width) in columns.iter_mut().enumerate().skip(start).take(span) {
        *width += share;
        if index == last {
            *width += remainder;
        }
    }
}

impl Metrics for FlowMetrics {
    fn window_size(&self) -> Size {
        self.window
    }

    fn outer_size(&self, tree: &BoxTree, key: BoxKey) -> Size {
        Size::new(
            self.outer_width(tree, key) as f32,
            self.outer_height(tree, key) as f32,
        )
    }

    fn content_size(&self, tree: &BoxTree, key: BoxKey) -> Size {
        if !tree.is_displayed(key) {
            return Size::default();
        }
        Size::new(
            self.content_width(tree, key) as f32,
            self.content_height(tree, key) as f32,
        )
    }

    fn offset(&self, tree: &BoxTree, key: BoxKey) -> Offset {
        let (left, top) = self.offset_of(tree, key);
        Offset {
            left: left as f32,
            top: top as f32,
        }
    }

    fn probe_scrollbar(&mut self) -> ScrollbarProbe {
        ScrollbarProbe {
            plain_width: PROBE_WIDTH,
            scrolling_width: PROBE_WIDTH - self.scrollbar,
        }
    }
}
