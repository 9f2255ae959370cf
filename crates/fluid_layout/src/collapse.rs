//! Hierarchical row collapse.
//!
//! The visibility rules are pure functions over the ordered rows of one
//! section. The tree glue at the bottom reads the rows, runs a rule and
//! writes back only the rows whose visibility changed.

use crate::error::LayoutError;
use box_tree::{BoxKey, BoxKind, BoxTree, CollapseDirection, CollapseState};
use log::debug;

/// Collapse-relevant state of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowState {
    /// `collapseLevel`; `None` for plain continuation rows.
    pub level: Option<u32>,
    pub state: CollapseState,
    pub direction: CollapseDirection,
    pub visible: bool,
}

impl RowState {
    /// A visible leveled row, open and extending forward.
    pub const fn leveled(level: u32) -> Self {
        Self {
            level: Some(level),
            state: CollapseState::Open,
            direction: CollapseDirection::Forward,
            visible: true,
        }
    }

    /// A visible plain row.
    pub const fn plain() -> Self {
        Self {
            level: None,
            state: CollapseState::Open,
            direction: CollapseDirection::Forward,
            visible: true,
        }
    }

    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.state = CollapseState::Hidden;
        self
    }

    #[must_use]
    pub const fn backward(mut self) -> Self {
        self.direction = CollapseDirection::Backward;
        self
    }

    #[must_use]
    pub const fn invisible(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Sibling indices visited from `index` in `direction`, nearest first.
fn walk(len: usize, index: usize, direction: CollapseDirection) -> Vec<usize> {
    match direction {
        CollapseDirection::Forward => (index + 1..len).collect(),
        CollapseDirection::Backward => (0..index.min(len)).rev().collect(),
    }
}

fn current_visibility(rows: &[RowState]) -> Vec<bool> {
    rows.iter().map(|row| row.visible).collect()
}

/// Hide every row of the subtree under `rows[index]`.
///
/// Rows are visited in the row's direction; a row without a level counts as
/// one level deeper. The walk stops at the first row at the same or a
/// shallower level. Stored states are never touched.
pub fn hide_subtree(rows: &[RowState], index: usize) -> Vec<bool> {
    let mut visible = current_visibility(rows);
    let Some(origin) = rows.get(index) else {
        return visible;
    };
    let Some(level) = origin.level else {
        return visible;
    };
    for sibling in walk(rows.len(), index, origin.direction) {
        let effective = rows
            .get(sibling)
            .and_then(|row| row.level)
            .unwrap_or(level + 1);
        if effective <= level {
            break;
        }
        if let Some(slot) = visible.get_mut(sibling) {
            *slot = false;
        }
    }
    visible
}

/// Reveal the subtree under `rows[index]`, honouring nested stored states.
///
/// The row's own plain rows become visible, then direct children one level
/// deeper; open children reveal their own subtrees in their own direction.
/// Plain rows owned by a deeper row are left to that row.
pub fn show_subtree(rows: &[RowState], index: usize) -> Vec<bool> {
    let mut visible = current_visibility(rows);
    reveal(rows, index, &mut visible);
    visible
}

fn reveal(rows: &[RowState], index: usize, visible: &mut [bool]) {
    let Some(origin) = rows.get(index) else {
        return;
    };
    let Some(level) = origin.level else {
        return;
    };
    let mut owns_plain_rows = true;
    for sibling in walk(rows.len(), index, origin.direction) {
        let Some(row) = rows.get(sibling) else {
            break;
        };
        match row.level {
            None if owns_plain_rows => {
                if let Some(slot) = visible.get_mut(sibling) {
                    *slot = true;
                }
            }
            None => {}
            Some(found) if found <= level => break,
            Some(found) => {
                owns_plain_rows = false;
                if found == level + 1 {
                    if let Some(slot) = visible.get_mut(sibling) {
                        *slot = true;
                    }
                    if row.state == CollapseState::Open {
                        reveal(rows, sibling, visible);
                    }
                }
            }
        }
    }
}

/// Flip `rows[index]`: hide its subtree if open, reveal it if hidden.
///
/// Returns the new stored state and the resulting visibility, or `None` if
/// the row has no level.
pub fn toggle(rows: &[RowState], index: usize) -> Option<(CollapseState, Vec<bool>)> {
    let row = rows.get(index)?;
    row.level?;
    let visibility = match row.state {
        CollapseState::Open => hide_subtree(rows, index),
        CollapseState::Hidden => show_subtree(rows, index),
    };
    Some((row.state.flipped(), visibility))
}

// ----------------------------------------------------------------------
// Tree glue
// ----------------------------------------------------------------------

/// The row siblings of `row` with their collapse state, and `row`'s index.
fn sibling_rows(
    tree: &BoxTree,
    row: BoxKey,
) -> Result<(Vec<BoxKey>, Vec<RowState>, usize), LayoutError> {
    let parent = tree.parent(row).ok_or(LayoutError::UnknownBox(row))?;
    let keys = tree.children_of_kind(parent, BoxKind::Row);
    let states = keys
        .iter()
        .map(|key| {
            let node = tree.node(*key)?;
            Ok(RowState {
                level: node.descriptor.collapse_level,
                state: node.descriptor.collapse_state,
                direction: node.descriptor.collapse_direction,
                visible: !node.style.hidden,
            })
        })
        .collect::<Result<Vec<_>, anyhow::Error>>()?;
    let index = keys
        .iter()
        .position(|key| *key == row)
        .ok_or(LayoutError::UnknownBox(row))?;
    Ok((keys, states, index))
}

fn write_visibility(
    tree: &mut BoxTree,
    keys: &[BoxKey],
    states: &[RowState],
    visible: &[bool],
) -> Result<usize, LayoutError> {
    let mut changed = 0;
    for ((key, before), after) in keys.iter().zip(states).zip(visible) {
        if before.visible != *after {
            tree.set_hidden(*key, !*after)?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Hide the subtree of a row without touching its stored state.
///
/// # Errors
///
/// Returns [`LayoutError::NotCollapsible`] for rows without a level.
pub fn hide_rows(tree: &mut BoxTree, row: BoxKey) -> Result<usize, LayoutError> {
    let (keys, states, index) = sibling_rows(tree, row)?;
    if states.get(index).and_then(|state| state.level).is_none() {
        return Err(LayoutError::NotCollapsible(row));
    }
    let visible = hide_subtree(&states, index);
    write_visibility(tree, &keys, &states, &visible)
}

/// Toggle a row in the tree: visibility, stored state and control glyph.
///
/// # Errors
///
/// Returns [`LayoutError::NotCollapsible`] for rows without a level and
/// [`LayoutError::UnknownBox`] for detached rows.
pub fn toggle_rows(tree: &mut BoxTree, row: BoxKey) -> Result<CollapseState, LayoutError> {
    let (keys, states, index) = sibling_rows(tree, row)?;
    let (state, visible) = toggle(&states, index).ok_or(LayoutError::NotCollapsible(row))?;
    let changed = write_visibility(tree, &keys, &states, &visible)?;
    tree.set_collapse_state(row, state)?;
    if let Some(control) = control_cell(tree, row) {
        tree.set_text(control, state.glyph())?;
    }
    debug!("Row {row:?} is now {state:?}, {changed} rows changed visibility");
    Ok(state)
}

/// The injected control cell of a row, if any.
pub fn control_cell(tree: &BoxTree, row: BoxKey) -> Option<BoxKey> {
    tree.children(row).iter().copied().find(|cell| {
        tree.get(*cell)
            .is_some_and(|node| node.kind == BoxKind::Cell && node.descriptor.collapse_control)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible_of(rows: &[RowState]) -> Vec<bool> {
        current_visibility(rows)
    }

    #[test]
    fn hiding_stops_at_a_peer() {
        let rows = [RowState::leveled(0), RowState::leveled(1), RowState::leveled(0)];
        assert_eq!(hide_subtree(&rows, 0), vec![true, false, true]);
    }

    #[test]
    fn hiding_covers_plain_and_nested_rows() {
        let rows = [
            RowState::leveled(1),
            RowState::plain(),
            RowState::leveled(2),
            RowState::leveled(3),
            RowState::leveled(1),
            RowState::plain(),
        ];
        assert_eq!(
            hide_subtree(&rows, 0),
            vec![true, false, false, false, true, true]
        );
    }

    #[test]
    fn backward_rows_collapse_preceding_siblings() {
        let rows = [
            RowState::leveled(0),
            RowState::leveled(1),
            RowState::plain(),
            RowState::leveled(0).backward(),
        ];
        assert_eq!(hide_subtree(&rows, 3), vec![true, false, false, true]);
    }

    #[test]
    fn showing_keeps_hidden_children_collapsed() {
        // 0: parent (hidden), 1: plain of parent, 2: child (hidden), 3: plain of child, 4: grandchild, 5: child (open), 6: grandchild
        let rows = [
            RowState::leveled(0).hidden(),
            RowState::plain().invisible(),
            RowState::leveled(1).hidden().invisible(),
            RowState::plain().invisible(),
            RowState::leveled(2).invisible(),
            RowState::leveled(1).invisible(),
            RowState::leveled(2).invisible(),
        ];
        assert_eq!(
            show_subtree(&rows, 0),
            vec![true, true, true, false, false, true, true]
        );
    }

    #[test]
    fn toggling_twice_restores_visibility() {
        let mut rows = vec![
            RowState::leveled(0),
            RowState::plain(),
            RowState::leveled(1).hidden(),
            RowState::plain().invisible(),
            RowState::leveled(2).invisible(),
            RowState::leveled(1),
            RowState::plain(),
            RowState::leveled(2),
            RowState::leveled(0),
        ];
        let before = visible_of(&rows);

        let (state, hidden) = toggle(&rows, 0).unwrap_or_default();
        assert_eq!(state, CollapseState::Hidden);
        assert_eq!(hidden, vec![true, false, false, false, false, false, false, false, true]);
        for (row, visible) in rows.iter_mut().zip(&hidden) {
            row.visible = *visible;
        }
        if let Some(row) = rows.get_mut(0) {
            row.state = state;
        }

        let (state, shown) = toggle(&rows, 0).unwrap_or_default();
        assert_eq!(state, CollapseState::Open);
        assert_eq!(shown, before);
    }

    #[test]
    fn plain_rows_cannot_toggle() {
        let rows = [RowState::leveled(0), RowState::plain()];
        assert_eq!(toggle(&rows, 1), None);
        assert_eq!(toggle(&rows, 5), None);
    }
}
