//! Column width resolution for grids with row and column spans.
//!
//! Resolution is a fold over row samples. The accumulator carries, per
//! logical column, how many further rows a rowspan still owns and the last
//! single-column width seen there.

use crate::error::LayoutError;
use box_tree::{BoxKey, BoxKind, BoxTree, MAX_COLSPAN, MAX_ROWSPAN, Metrics};
use core::fmt;
use smallvec::SmallVec;

/// One cell as rendered: outer width and spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSample {
    pub width: i32,
    pub rowspan: u32,
    pub colspan: u32,
}

impl CellSample {
    pub const fn new(width: i32) -> Self {
        Self {
            width,
            rowspan: 1,
            colspan: 1,
        }
    }

    #[must_use]
    pub const fn spanning(mut self, rowspan: u32, colspan: u32) -> Self {
        self.rowspan = rowspan;
        self.colspan = colspan;
        self
    }
}

/// The visible cells of one row, left to right.
pub type RowSample = SmallVec<CellSample, 8>;

/// Resolved outer width per logical column.
pub type ColumnWidths = SmallVec<i32, 16>;

/// Why a grid's columns could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Irregularity {
    /// No row contributed any column.
    NoColumns,
    /// A column was only ever covered by multi-column cells.
    Unsampled(usize),
    /// A row covers a different number of columns than the rows before it.
    Occupancy {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for Irregularity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoColumns => formatter.write_str("no columns observed"),
            Self::Unsampled(column) => {
                write!(formatter, "column {column} has no single-column cell")
            }
            Self::Occupancy {
                row,
                expected,
                found,
            } => write!(
                formatter,
                "row {row} covers {found} columns, expected {expected}"
            ),
        }
    }
}

#[derive(Debug, Default)]
struct SpanState {
    widths: Vec<Option<i32>>,
    /// Rows still owned by a rowspan, per column.
    carried: Vec<u32>,
    established: Option<usize>,
}

impl SpanState {
    fn consume(mut self, index: usize, row: &RowSample) -> Result<Self, Irregularity> {
        let mut column = 0;
        for cell in row.iter() {
            while self.carried.get(column).is_some_and(|rows| *rows > 0) {
                column += 1;
            }
            let span = usize::try_from(cell.colspan.clamp(1, MAX_COLSPAN)).unwrap_or(1);
            if self.carried.len() < column + span {
                self.carried.resize(column + span, 0);
            }
            if self.widths.len() < column + span {
                self.widths.resize(column + span, None);
            }
            for slot in self.carried.iter_mut().skip(column).take(span) {
                *slot = cell.rowspan.clamp(1, MAX_ROWSPAN);
            }
            if let Some(width) = self.widths.get_mut(column).filter(|_| span == 1) {
                *width = Some(cell.width);
            }
            column += span;
        }

        let occupied = self
            .carried
            .iter()
            .rposition(|rows| *rows > 0)
            .map_or(0, |last| last + 1);
        match self.established {
            None => self.established = Some(occupied),
            Some(expected) if expected != occupied => {
                return Err(Irregularity::Occupancy {
                    row: index,
                    expected,
                    found: occupied,
                });
            }
            Some(_) => {}
        }
        for rows in &mut self.carried {
            *rows = rows.saturating_sub(1);
        }
        Ok(self)
    }

    fn finish(self, compensate: bool) -> Result<ColumnWidths, Irregularity> {
        if self.widths.is_empty() {
            return Err(Irregularity::NoColumns);
        }
        let bump = i32::from(compensate);
        self.widths
            .iter()
            .enumerate()
            .map(|(column, width)| {
                width
                    .map(|found| found + bump)
                    .ok_or(Irregularity::Unsampled(column))
            })
            .collect()
    }
}

/// Resolve per-column widths from row samples, header rows first.
///
/// When `compensate` is set every width gets one extra pixel, covering
/// sub-pixel rounding before the scrollbar thickness is known.
///
/// # Errors
///
/// Returns the [`Irregularity`] that prevented a consistent column count.
pub fn resolve_columns<I>(rows: I, compensate: bool) -> Result<ColumnWidths, Irregularity>
where
    I: IntoIterator<Item = RowSample>,
{
    rows.into_iter()
        .enumerate()
        .try_fold(SpanState::default(), |state, (index, row)| {
            state.consume(index, &row)
        })?
        .finish(compensate)
}

/// Sample the visible rows of a grid (header, body, footer) as rendered.
pub fn sample_grid<M: Metrics>(tree: &BoxTree, metrics: &M, grid: BoxKey) -> Vec<RowSample> {
    tree.grid_rows(grid)
        .into_iter()
        .filter(|row| !tree.style(*row).hidden)
        .map(|row| {
            tree.children(row)
                .iter()
                .filter_map(|cell| tree.get(*cell).map(|node| (*cell, node)))
                .filter(|(_, node)| node.kind == BoxKind::Cell && !node.style.hidden)
                .map(|(cell, node)| CellSample {
                    width: metrics.outer_size(tree, cell).width.ceil() as i32,
                    rowspan: node.descriptor.rowspan,
                    colspan: node.descriptor.colspan,
                })
                .collect()
        })
        .collect()
}

/// Resolve the columns of a grid in the tree.
///
/// # Errors
///
/// Returns [`LayoutError::IrregularGrid`] when the spans cannot be reconciled.
pub fn resolve_grid<M: Metrics>(
    tree: &BoxTree,
    metrics: &M,
    grid: BoxKey,
    compensate: bool,
) -> Result<ColumnWidths, LayoutError> {
    resolve_columns(sample_grid(tree, metrics, grid), compensate).map_err(|irregularity| {
        LayoutError::IrregularGrid {
            grid,
            reason: irregularity.to_string(),
        }
    })
}
