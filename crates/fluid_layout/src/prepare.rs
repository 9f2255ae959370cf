//! One-time grid preparation run before the first split.

use crate::error::LayoutError;
use box_tree::{BoxKey, BoxKind, BoxTree, CollapseState, SectionRole};
use log::debug;

/// Grids inside `scope` (including `scope` itself), in document order.
pub fn grids_in(tree: &BoxTree, scope: BoxKey) -> Vec<BoxKey> {
    let mut grids: Vec<BoxKey> = tree
        .descendants(scope)
        .into_iter()
        .filter(|key| tree.kind(*key) == Some(BoxKind::Grid))
        .collect();
    if tree.kind(scope) == Some(BoxKind::Grid) {
        grids.insert(0, scope);
    }
    grids
}

/// Rows of a grid grouped by their direct container, sections first.
fn row_groups(tree: &BoxTree, grid: BoxKey) -> Vec<Vec<BoxKey>> {
    tree.children(grid)
        .iter()
        .filter(|child| matches!(tree.kind(**child), Some(BoxKind::Section(_))))
        .map(|section| tree.children_of_kind(*section, BoxKind::Row))
        .chain([tree.children_of_kind(grid, BoxKind::Row)])
        .collect()
}

/// Reverse the body rows of every grid marked `ubReverse`.
///
/// # Errors
///
/// Returns [`LayoutError::Tree`] when a row cannot be moved.
pub fn reverse_rows(tree: &mut BoxTree, scope: BoxKey) -> Result<usize, LayoutError> {
    let mut reversed = 0;
    for grid in grids_in(tree, scope) {
        if !tree.node(grid)?.descriptor.reverse {
            continue;
        }
        let bodies = tree.children_of_kind(grid, BoxKind::Section(SectionRole::Body));
        for body in bodies {
            let rows = tree.children_of_kind(body, BoxKind::Row);
            for row in &rows {
                let Some(first) = tree.children(body).first().copied() else {
                    break;
                };
                if first != *row {
                    tree.insert_before(first, *row)?;
                }
            }
            reversed += 1;
        }
    }
    Ok(reversed)
}

/// Remove rows that have no children at all.
///
/// # Errors
///
/// Returns [`LayoutError::Tree`] when a row cannot be removed.
pub fn remove_empty_rows(tree: &mut BoxTree, scope: BoxKey) -> Result<usize, LayoutError> {
    let mut removed = 0;
    for grid in grids_in(tree, scope) {
        for row in row_groups(tree, grid).into_iter().flatten() {
            if tree.children(row).is_empty() {
                tree.remove(row)?;
                removed += 1;
            }
        }
    }
    if removed > 0 {
        debug!("Removed {removed} empty rows");
    }
    Ok(removed)
}

/// Prepend a collapse control cell to every row of grids that use collapse levels.
///
/// Leveled rows get the toggle glyph and default `collapseState` and
/// `collapseDirection` attributes; the remaining rows get an empty cell so the
/// columns stay aligned.
///
/// # Errors
///
/// Returns [`LayoutError::Tree`] when a cell cannot be created.
pub fn add_collapse_controls(tree: &mut BoxTree, scope: BoxKey) -> Result<usize, LayoutError> {
    let mut added = 0;
    for grid in grids_in(tree, scope) {
        let rows: Vec<BoxKey> = row_groups(tree, grid).into_iter().flatten().collect();
        let leveled = rows.iter().any(|row| {
            tree.get(*row)
                .is_some_and(|node| node.descriptor.collapse_level.is_some())
        });
        if !leveled {
            continue;
        }
        for row in rows {
            let has_control = tree
                .descendants(row)
                .iter()
                .any(|key| tree.get(*key).is_some_and(|node| node.descriptor.collapse_control));
            if has_control {
                continue;
            }
            let cell = tree.create_element(row, Some(0), "td")?;
            tree.set_attr(cell, "collapseCell", "yes")?;
            let node = tree.node(row)?;
            if node.descriptor.collapse_level.is_none() {
                added += 1;
                continue;
            }
            let missing_state = node.attr("collapseState").is_none();
            let missing_direction = node.attr("collapseDirection").is_none();
            let state = node.descriptor.collapse_state;
            if missing_state {
                tree.set_attr(row, "collapseState", CollapseState::Open.as_attr())?;
            }
            if missing_direction {
                tree.set_attr(row, "collapseDirection", "after")?;
            }
            tree.set_attr(cell, "class", "collapse")?;
            tree.set_text(cell, state.glyph())?;
            added += 1;
        }
    }
    Ok(added)
}

/// Leveled rows stored as hidden, in document order.
pub fn initially_hidden_rows(tree: &BoxTree, scope: BoxKey) -> Vec<BoxKey> {
    tree.descendants(scope)
        .into_iter()
        .filter(|key| {
            tree.get(*key).is_some_and(|node| {
                node.kind == BoxKind::Row
                    && node.descriptor.collapse_level.is_some()
                    && node.descriptor.collapse_state == CollapseState::Hidden
            })
        })
        .collect()
}
