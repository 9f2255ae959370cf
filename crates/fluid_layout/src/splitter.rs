//! Table splitting.
//!
//! A scroll-marked grid is wrapped in a frame box and restructured into one
//! auxiliary grid per present section (header, body, footer), each inside its
//! own wrapper. A zero-height synchronization row in every auxiliary grid
//! pins the columns to the widths resolved from the source grid. The source
//! grid stays in the frame, hidden, and is the reservoir rows return to on
//! every resync.
//!
//! ```text
//! frame (overflow hidden, scroll markers)
//! ├── wrapper[header] ── grid ── thead(sync row) + tbody(header rows)
//! ├── wrapper[body]   ── grid ── thead(sync row) + tbody(body rows)   (scrolls)
//! ├── wrapper[footer] ── grid ── thead(sync row) + tbody(footer rows)
//! └── source grid (hidden)
//! ```

use crate::columns::{ColumnWidths, resolve_grid};
use crate::error::LayoutError;
use crate::viewport::Viewport;
use box_tree::{
    BoxKey, BoxKind, BoxTree, InlineStyle, Metrics, Overflow, SectionRole, SplitGroupId,
    SplitMembership, SplitRole,
};
use log::{debug, warn};
use smallvec::SmallVec;

/// Attributes that make a box a scroll region and move to the frame.
const SCROLL_ATTRS: [&str; 3] = ["scrollable", "ubScrollHeight", "ubScrollWidth"];

/// Environment a split is built or resynchronized against.
#[derive(Debug, Clone, Copy)]
pub struct SplitEnv {
    pub viewport: Viewport,
    pub scrollbar: i32,
    /// Add one pixel per column (scrollbar not yet measured).
    pub compensate: bool,
}

impl SplitEnv {
    /// Widest a split grid may be while leaving room for a scrollbar.
    const fn max_width(&self) -> i32 {
        self.viewport.width - self.scrollbar
    }
}

/// One section of a split: wrapper, auxiliary grid and its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSection {
    pub role: SectionRole,
    pub wrapper: BoxKey,
    pub grid: BoxKey,
    /// Row container inside the auxiliary grid.
    pub rows: BoxKey,
    pub sync_row: BoxKey,
}

/// A grid split into independently scrolling sections.
#[derive(Debug, Clone)]
pub struct SplitGroup {
    id: SplitGroupId,
    frame: BoxKey,
    source: BoxKey,
    sections: SmallVec<SplitSection, 3>,
    columns: Option<ColumnWidths>,
    grid_width: i32,
    horizontal_overflow: bool,
    /// Source style at wrap time, restored on every resync.
    source_style: InlineStyle,
}

impl SplitGroup {
    pub const fn id(&self) -> SplitGroupId {
        self.id
    }

    /// Outer box carrying the scroll markers.
    pub const fn frame(&self) -> BoxKey {
        self.frame
    }

    /// The original grid.
    pub const fn source(&self) -> BoxKey {
        self.source
    }

    pub fn sections(&self) -> &[SplitSection] {
        &self.sections
    }

    pub fn section(&self, role: SectionRole) -> Option<&SplitSection> {
        self.sections.iter().find(|section| section.role == role)
    }

    /// Resolved column widths, `None` while the grid is irregular.
    pub fn columns(&self) -> Option<&[i32]> {
        self.columns.as_deref()
    }

    /// Width the auxiliary grids are laid out at.
    pub const fn grid_width(&self) -> i32 {
        self.grid_width
    }

    /// Whether the last resync had to clamp the grid below its natural width.
    pub const fn horizontal_overflow(&self) -> bool {
        self.horizontal_overflow
    }

    /// Split `source` into a new group.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnknownBox`] for a detached source and
    /// [`LayoutError::Tree`] when a structural mutation fails. Irregular
    /// grids are not an error: the split is built without synchronization
    /// cells.
    pub fn construct<M: Metrics>(
        tree: &mut BoxTree,
        metrics: &M,
        source: BoxKey,
        id: SplitGroupId,
        env: SplitEnv,
    ) -> Result<Self, LayoutError> {
        let frame = wrap_source(tree, metrics, source, id, env)?;
        ensure_body_section(tree, source)?;

        if outer_width(tree, metrics, source) >= env.viewport.width {
            let target = env.viewport.width - env.scrollbar - 1;
            set_outer_width(tree, metrics, source, target)?;
        }

        let columns = resolve_or_warn(tree, metrics, source, env);
        let column_count = columns.as_ref().map_or(0, |found| found.len() as i32);
        let mut grid_width = outer_width(tree, metrics, source) + column_count;
        if grid_width >= env.max_width() {
            grid_width = env.max_width() - 2;
        }
        let wrapper_width = grid_width + env.scrollbar;

        let mut sections = SmallVec::new();
        for role in SectionRole::ALL {
            let source_section = tree.section(source, role);
            let has_rows = source_section
                .is_some_and(|section| !tree.children_of_kind(section, BoxKind::Row).is_empty());
            if role != SectionRole::Body && !has_rows {
                continue;
            }
            let section = build_section(tree, frame, source, role, id, grid_width, wrapper_width)?;
            fill_sync_row(tree, section.sync_row, columns.as_deref())?;
            if let Some(original) = source_section {
                if let Some(id_attr) = tree.take_id(original)? {
                    tree.set_attr(section.rows, "id", &id_attr)?;
                }
                move_rows(tree, original, section.rows)?;
            }
            sections.push(section);
        }
        tree.set_hidden(source, true)?;

        debug!(
            "Split grid {source:?} into {} sections as {id:?} ({} columns, width {grid_width})",
            sections.len(),
            column_count
        );
        let source_style = tree.style(source);
        Ok(Self {
            id,
            frame,
            source,
            sections,
            columns,
            grid_width,
            horizontal_overflow: false,
            source_style: InlineStyle {
                hidden: false,
                ..source_style
            },
        })
    }

    /// Move every row back into the source grid and hide the wrappers.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Tree`] when a structural mutation fails.
    pub fn restore_rows(&self, tree: &mut BoxTree) -> Result<(), LayoutError> {
        for section in &self.sections {
            let target = match tree.section(self.source, section.role) {
                Some(existing) => existing,
                None => create_section(tree, self.source, section.role)?,
            };
            move_rows(tree, section.rows, target)?;
            tree.set_hidden(section.wrapper, true)?;
        }
        Ok(())
    }

    /// Reconstitute the source, re-resolve its columns and split it again.
    ///
    /// Returns whether the grid overflows the viewport horizontally.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Tree`] when a structural mutation fails.
    pub fn resync<M: Metrics>(
        &mut self,
        tree: &mut BoxTree,
        metrics: &M,
        env: SplitEnv,
    ) -> Result<bool, LayoutError> {
        tree.update_style(self.frame, |style| {
            style.width = None;
            style.min_width = None;
        })?;
        self.restore_rows(tree)?;
        let saved = self.source_style;
        tree.update_style(self.source, |style| *style = saved)?;

        let mut overflow = false;
        if outer_width(tree, metrics, self.source) > env.max_width() {
            set_outer_width(tree, metrics, self.source, env.max_width() - 2)?;
            overflow = outer_width(tree, metrics, self.source) > env.max_width();
        }

        let columns = resolve_or_warn(tree, metrics, self.source, env);
        let width_sum = columns.as_ref().map_or_else(
            || outer_width(tree, metrics, self.source),
            |found| found.iter().map(|width| width + 1).sum(),
        );
        tree.set_hidden(self.source, true)?;

        for section in &self.sections {
            if let Some(original) = tree.section(self.source, section.role) {
                move_rows(tree, original, section.rows)?;
            }
            fill_sync_row(tree, section.sync_row, columns.as_deref())?;
            tree.update_style(section.grid, |style| style.width = Some(width_sum))?;
            tree.set_hidden(section.wrapper, false)?;
        }

        let measured = self
            .sections
            .first()
            .map_or(width_sum, |section| outer_width(tree, metrics, section.grid));
        let grid_width = measured.max(width_sum);
        for section in &self.sections {
            let wrapper_width = if section.role == SectionRole::Body {
                grid_width + env.scrollbar
            } else {
                grid_width
            };
            tree.update_style(section.wrapper, |style| {
                style.width = Some(wrapper_width);
                style.min_width = Some(wrapper_width);
            })?;
        }
        tree.update_style(self.frame, |style| {
            style.width = Some(grid_width + env.scrollbar);
        })?;

        self.columns = columns;
        self.grid_width = grid_width;
        self.horizontal_overflow = overflow;
        Ok(overflow)
    }
}

fn outer_width<M: Metrics>(tree: &BoxTree, metrics: &M, key: BoxKey) -> i32 {
    metrics.outer_size(tree, key).width.ceil() as i32
}

/// Declare a content width so that the outer width becomes `target`.
fn set_outer_width<M: Metrics>(
    tree: &mut BoxTree,
    metrics: &M,
    key: BoxKey,
    target: i32,
) -> Result<(), LayoutError> {
    let chrome = outer_width(tree, metrics, key)
        - metrics.content_size(tree, key).width.ceil() as i32;
    let width = (target - chrome).max(0);
    tree.update_style(key, |style| style.width = Some(width))?;
    Ok(())
}

fn resolve_or_warn<M: Metrics>(
    tree: &BoxTree,
    metrics: &M,
    source: BoxKey,
    env: SplitEnv,
) -> Option<ColumnWidths> {
    match resolve_grid(tree, metrics, source, env.compensate) {
        Ok(columns) => Some(columns),
        Err(err) => {
            warn!("Failed to synchronize columns: {err}");
            None
        }
    }
}

fn mark(
    tree: &mut BoxTree,
    key: BoxKey,
    group: SplitGroupId,
    role: SplitRole,
) -> Result<(), LayoutError> {
    tree.descriptor_mut(key)?.split = Some(SplitMembership { group, role });
    Ok(())
}

/// Wrap the source in a frame box that takes over its scroll markers.
fn wrap_source<M: Metrics>(
    tree: &mut BoxTree,
    metrics: &M,
    source: BoxKey,
    id: SplitGroupId,
    env: SplitEnv,
) -> Result<BoxKey, LayoutError> {
    let parent = tree.parent(source).ok_or(LayoutError::UnknownBox(source))?;
    let position = tree
        .children(parent)
        .iter()
        .position(|child| *child == source)
        .ok_or(LayoutError::UnknownBox(source))?;

    if outer_width(tree, metrics, source) + 1 > env.max_width() {
        set_outer_width(tree, metrics, source, env.max_width())?;
    }
    let wrapped_width = outer_width(tree, metrics, source) + 1;

    let frame = tree.create_element(parent, Some(position), "div")?;
    move_markers(tree, source, frame)?;
    tree.update_style(frame, |style| {
        style.overflow = Overflow::Hidden;
        style.width = Some(wrapped_width + env.scrollbar);
    })?;
    tree.append_child(frame, source)?;
    mark(tree, frame, id, SplitRole::Frame)?;
    mark(tree, source, id, SplitRole::Source)?;
    Ok(frame)
}

fn move_markers(tree: &mut BoxTree, source: BoxKey, frame: BoxKey) -> Result<(), LayoutError> {
    let node = tree.node(source)?;
    let markers: Vec<(String, String)> = SCROLL_ATTRS
        .iter()
        .filter_map(|name| node.attr(name).map(|value| ((*name).to_owned(), value.to_owned())))
        .collect();
    let class = node.attr("class").map(str::to_owned);

    for (name, value) in markers {
        tree.set_attr(frame, &name, &value)?;
        tree.remove_attr(source, &name)?;
    }
    if let Some(class) = class {
        tree.set_attr(frame, "class", &class)?;
        let remaining = class
            .split_whitespace()
            .filter(|token| *token != "scrollable")
            .collect::<Vec<_>>()
            .join(" ");
        tree.set_attr(source, "class", &remaining)?;
    }
    Ok(())
}

/// Give the source a body section and move loose rows into it.
fn ensure_body_section(tree: &mut BoxTree, source: BoxKey) -> Result<BoxKey, LayoutError> {
    let body = match tree.section(source, SectionRole::Body) {
        Some(existing) => existing,
        None => create_section(tree, source, SectionRole::Body)?,
    };
    for row in tree.children_of_kind(source, BoxKind::Row) {
        tree.append_child(body, row)?;
    }
    Ok(body)
}

/// Create a section in the source, keeping header, body, footer order.
fn create_section(
    tree: &mut BoxTree,
    grid: BoxKey,
    role: SectionRole,
) -> Result<BoxKey, LayoutError> {
    let position = match role {
        SectionRole::Header => Some(0),
        SectionRole::Body => tree
            .section(grid, SectionRole::Footer)
            .and_then(|footer| tree.children(grid).iter().position(|child| *child == footer)),
        SectionRole::Footer => None,
    };
    Ok(tree.create_element(grid, position, role.tag())?)
}

fn move_rows(tree: &mut BoxTree, from: BoxKey, to: BoxKey) -> Result<(), LayoutError> {
    for row in tree.children_of_kind(from, BoxKind::Row) {
        tree.append_child(to, row)?;
    }
    Ok(())
}

/// Build one wrapper with its auxiliary grid and empty synchronization row.
fn build_section(
    tree: &mut BoxTree,
    frame: BoxKey,
    source: BoxKey,
    role: SectionRole,
    group: SplitGroupId,
    grid_width: i32,
    wrapper_width: i32,
) -> Result<SplitSection, LayoutError> {
    let position = tree.children(frame).iter().position(|child| *child == source);
    let wrapper = tree.create_element(frame, position, "div")?;
    tree.update_style(wrapper, |style| {
        style.width = Some(wrapper_width);
        if role == SectionRole::Body {
            style.overflow = Overflow::ScrollY;
        }
    })?;
    let grid = tree.create_element(wrapper, None, "table")?;
    tree.update_style(grid, |style| style.width = Some(grid_width))?;
    let head = tree.create_element(grid, None, SectionRole::Header.tag())?;
    let sync_row = tree.create_element(head, None, "tr")?;
    let rows = tree.create_element(grid, None, SectionRole::Body.tag())?;

    mark(tree, wrapper, group, SplitRole::Wrapper(role))?;
    mark(tree, grid, group, SplitRole::Auxiliary(role))?;
    mark(tree, sync_row, group, SplitRole::SyncRow)?;
    Ok(SplitSection {
        role,
        wrapper,
        grid,
        rows,
        sync_row,
    })
}

/// Replace the cells of a synchronization row with one zero-height cell per column.
fn fill_sync_row(
    tree: &mut BoxTree,
    sync_row: BoxKey,
    columns: Option<&[i32]>,
) -> Result<(), LayoutError> {
    for cell in tree.children(sync_row).to_vec() {
        tree.remove(cell)?;
    }
    for width in columns.unwrap_or_default() {
        let cell = tree.create_element(sync_row, None, "th")?;
        let width = *width;
        tree.update_style(cell, |style| {
            style.width = Some(width);
            style.height = Some(0);
        })?;
    }
    Ok(())
}
