//! Merge planning: which neighbouring cells collapse into one visual cell.
//!
//! The planner only looks at post-format content and per-cell eligibility.
//! Its output is a partition of the grid into rectangular [`Span`]s.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    #[default]
    None,
    Horizontal,
    Vertical,
    Hierarchical,
    Both,
}

impl MergeMode {
    /// Whether the mode needs rows other than the current one.
    pub fn crosses_rows(self) -> bool {
        matches!(
            self,
            MergeMode::Vertical | MergeMode::Hierarchical | MergeMode::Both
        )
    }

    /// Closest mode that only looks within a single row.
    pub fn row_local(self) -> MergeMode {
        match self {
            MergeMode::Horizontal | MergeMode::Both => MergeMode::Horizontal,
            _ => MergeMode::None,
        }
    }

    fn strategy(self) -> Strategy {
        match self {
            MergeMode::None => plan_none,
            MergeMode::Horizontal => plan_horizontal,
            MergeMode::Vertical => plan_vertical,
            MergeMode::Hierarchical => plan_hierarchical,
            MergeMode::Both => plan_both,
        }
    }
}

impl std::str::FromStr for MergeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Ok(MergeMode::None),
            "horizontal" => Ok(MergeMode::Horizontal),
            "vertical" => Ok(MergeMode::Vertical),
            "hierarchical" => Ok(MergeMode::Hierarchical),
            "both" => Ok(MergeMode::Both),
            other => Err(format!("unknown merge mode: {other}")),
        }
    }
}

/// What the planner needs to know about one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeInput {
    pub content: String,
    /// False for cells with `Skip` alignment.
    pub mergeable: bool,
}

impl MergeInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mergeable: true,
        }
    }
}

/// A rectangular run of cells drawn as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Span {
    pub fn single(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            rows: 1,
            cols: 1,
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row..self.row + self.rows).contains(&row)
            && (self.col..self.col + self.cols).contains(&col)
    }

    pub fn is_anchor(&self, row: usize, col: usize) -> bool {
        self.row == row && self.col == col
    }

    pub fn last_row(&self) -> usize {
        self.row + self.rows - 1
    }
}

type Strategy = fn(&Grid<'_>) -> Vec<Span>;

struct Grid<'a> {
    cells: &'a [Vec<MergeInput>],
    columns: usize,
    filter: &'a [usize],
}

impl Grid<'_> {
    fn content(&self, row: usize, col: usize) -> Option<&str> {
        self.cells[row].get(col).map(|cell| cell.content.as_str())
    }

    fn eligible(&self, row: usize, col: usize) -> bool {
        if !self.filter.is_empty() && !self.filter.contains(&col) {
            return false;
        }
        match self.cells[row].get(col) {
            Some(cell) => cell.mergeable && !cell.content.trim().is_empty(),
            None => false,
        }
    }

    fn same(&self, a: (usize, usize), b: (usize, usize)) -> bool {
        self.content(a.0, a.1) == self.content(b.0, b.1)
    }

    fn joinable(&self, a: (usize, usize), b: (usize, usize)) -> bool {
        self.eligible(a.0, a.1) && self.eligible(b.0, b.1) && self.same(a, b)
    }
}

/// The planner's answer: spans plus a cell -> span lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanMap {
    spans: Vec<Span>,
    owner: Vec<Vec<usize>>,
}

impl SpanMap {
    fn from_spans(mut spans: Vec<Span>, rows: usize, columns: usize) -> Self {
        spans.sort_by_key(|span| (span.row, span.col));
        let mut owner = vec![vec![usize::MAX; columns]; rows];
        for (idx, span) in spans.iter().enumerate() {
            for row in span.row..span.row + span.rows {
                for col in span.col..span.col + span.cols {
                    debug_assert_eq!(owner[row][col], usize::MAX, "overlapping spans");
                    owner[row][col] = idx;
                }
            }
        }
        Self { spans, owner }
    }

    /// Every cell in its own span.
    pub fn unmerged(rows: usize, columns: usize) -> Self {
        plan_with(&vec![Vec::new(); rows], columns, MergeMode::None, &[])
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn rows(&self) -> usize {
        self.owner.len()
    }

    pub fn span_at(&self, row: usize, col: usize) -> &Span {
        &self.spans[self.owner[row][col]]
    }

    /// True when `(row, col)` and `(row, col + 1)` share a span.
    pub fn joins_right(&self, row: usize, col: usize) -> bool {
        self.owner[row].get(col + 1) == Some(&self.owner[row][col])
    }

    /// True when `(row, col)` and `(row + 1, col)` share a span.
    pub fn joins_down(&self, row: usize, col: usize) -> bool {
        self.owner
            .get(row + 1)
            .map(|next| next[col] == self.owner[row][col])
            .unwrap_or(false)
    }
}

/// Plans merges over a grid whose rows all have the same column count.
pub fn plan(grid: &[Vec<MergeInput>], mode: MergeMode, filter: &[usize]) -> SpanMap {
    let columns = grid.iter().map(Vec::len).max().unwrap_or(0);
    plan_with(grid, columns, mode, filter)
}

fn plan_with(
    cells: &[Vec<MergeInput>],
    columns: usize,
    mode: MergeMode,
    filter: &[usize],
) -> SpanMap {
    let grid = Grid {
        cells,
        columns,
        filter,
    };
    let spans = (mode.strategy())(&grid);
    SpanMap::from_spans(spans, cells.len(), columns)
}

fn plan_none(grid: &Grid<'_>) -> Vec<Span> {
    let mut spans = Vec::with_capacity(grid.cells.len() * grid.columns);
    for row in 0..grid.cells.len() {
        for col in 0..grid.columns {
            spans.push(Span::single(row, col));
        }
    }
    spans
}

fn horizontal_runs(grid: &Grid<'_>, row: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut col = 0;
    while col < grid.columns {
        let mut span = Span::single(row, col);
        while span.col + span.cols < grid.columns
            && grid.joinable((row, span.col), (row, span.col + span.cols))
        {
            span.cols += 1;
        }
        col += span.cols;
        spans.push(span);
    }
    spans
}

fn plan_horizontal(grid: &Grid<'_>) -> Vec<Span> {
    (0..grid.cells.len())
        .flat_map(|row| horizontal_runs(grid, row))
        .collect()
}

/// Column-by-column vertical runs where `extends(row, col)` decides whether
/// `row` continues the run from `row - 1`.
fn vertical_runs(grid: &Grid<'_>, extends: impl Fn(usize, usize) -> bool) -> Vec<Span> {
    let mut spans = Vec::new();
    for col in 0..grid.columns {
        let mut row = 0;
        while row < grid.cells.len() {
            let mut span = Span::single(row, col);
            while span.row + span.rows < grid.cells.len() && extends(span.row + span.rows, col) {
                span.rows += 1;
            }
            row += span.rows;
            spans.push(span);
        }
    }
    spans
}

fn plan_vertical(grid: &Grid<'_>) -> Vec<Span> {
    vertical_runs(grid, |row, col| grid.joinable((row - 1, col), (row, col)))
}

fn plan_hierarchical(grid: &Grid<'_>) -> Vec<Span> {
    vertical_runs(grid, |row, col| {
        grid.joinable((row - 1, col), (row, col))
            && (0..col).all(|ancestor| grid.same((row - 1, ancestor), (row, ancestor)))
    })
}

fn plan_both(grid: &Grid<'_>) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    // Indices of spans that reach the previous row and may still grow.
    let mut open: Vec<usize> = Vec::new();
    for row in 0..grid.cells.len() {
        let mut next_open = Vec::new();
        for run in horizontal_runs(grid, row) {
            let continued = open.iter().copied().find(|&idx| {
                let above = spans[idx];
                above.col == run.col
                    && above.cols == run.cols
                    && above.last_row() + 1 == row
                    && grid.joinable((row - 1, run.col), (row, run.col))
            });
            match continued {
                Some(idx) => {
                    spans[idx].rows += 1;
                    next_open.push(idx);
                }
                None => {
                    next_open.push(spans.len());
                    spans.push(run);
                }
            }
        }
        open = next_open;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<MergeInput>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| MergeInput::new(*cell)).collect())
            .collect()
    }

    fn assert_partition(map: &SpanMap, rows: usize, columns: usize) {
        let mut covered = vec![vec![0usize; columns]; rows];
        for span in map.spans() {
            for row in span.row..span.row + span.rows {
                for col in span.col..span.col + span.cols {
                    covered[row][col] += 1;
                }
            }
        }
        assert!(covered.iter().flatten().all(|&count| count == 1));
    }

    const MODES: [MergeMode; 5] = [
        MergeMode::None,
        MergeMode::Horizontal,
        MergeMode::Vertical,
        MergeMode::Hierarchical,
        MergeMode::Both,
    ];

    fn sample() -> Vec<Vec<MergeInput>> {
        grid(&[
            &["1", "A", "A", "x"],
            &["1", "A", "A", "y"],
            &["1", "B", "B", "y"],
            &["2", "B", "", "y"],
            &["2", "B", "", "z"],
        ])
    }

    #[test]
    fn every_mode_tiles_the_grid() {
        let grid = sample();
        for mode in MODES {
            let map = plan(&grid, mode, &[]);
            assert_partition(&map, 5, 4);
            let filtered = plan(&grid, mode, &[1, 3]);
            assert_partition(&filtered, 5, 4);
        }
    }

    #[test]
    fn planning_is_deterministic() {
        let grid = sample();
        for mode in MODES {
            assert_eq!(plan(&grid, mode, &[]), plan(&grid, mode, &[]));
        }
    }

    #[test]
    fn vertical_merges_matching_rows_in_one_column() {
        let grid = grid(&[&["A", "x"], &["A", "y"]]);
        let map = plan(&grid, MergeMode::Vertical, &[0]);
        assert_eq!(
            map.span_at(1, 0),
            &Span {
                row: 0,
                col: 0,
                rows: 2,
                cols: 1
            }
        );
        assert!(map.joins_down(0, 0));
        assert!(!map.joins_down(0, 1));
    }

    #[test]
    fn horizontal_merges_identical_neighbours() {
        let map = plan(&sample(), MergeMode::Horizontal, &[]);
        assert_eq!(map.span_at(0, 2).col, 1);
        assert_eq!(map.span_at(0, 2).cols, 2);
        assert!(map.joins_right(0, 1));
        assert!(!map.joins_right(0, 0));
        // Empty cells never merge.
        assert!(!map.joins_right(3, 1));
    }

    #[test]
    fn skip_alignment_breaks_horizontal_runs() {
        let mut grid = grid(&[&["a", "a", "a"]]);
        grid[0][1].mergeable = false;
        let map = plan(&grid, MergeMode::Horizontal, &[]);
        assert_eq!(map.spans().len(), 3);
    }

    #[test]
    fn unlisted_columns_never_merge() {
        let grid = grid(&[&["A", "x"], &["A", "x"]]);
        let map = plan(&grid, MergeMode::Vertical, &[1]);
        assert!(!map.joins_down(0, 0));
        assert!(map.joins_down(0, 1));
    }

    #[test]
    fn hierarchical_requires_matching_ancestors() {
        let map = plan(&sample(), MergeMode::Hierarchical, &[]);
        // Column 1 "B" continues from row 2 to row 3 in plain vertical mode,
        // but column 0 changes from "1" to "2" so the chain breaks.
        assert!(!map.joins_down(1, 1));
        assert!(map.joins_down(0, 1));
        assert!(!map.joins_down(2, 1));
        assert!(map.joins_down(3, 1));
        let vertical = plan(&sample(), MergeMode::Vertical, &[]);
        assert!(vertical.joins_down(2, 1));
        // Column 3 "y" spans rows 1..=3 vertically but its ancestors differ.
        assert!(vertical.joins_down(1, 3));
        assert!(!map.joins_down(1, 3));
    }

    #[test]
    fn hierarchical_prefix_property_holds() {
        let grid = sample();
        let map = plan(&grid, MergeMode::Hierarchical, &[]);
        for row in 1..grid.len() {
            for col in 0..4 {
                if map.joins_down(row - 1, col) {
                    for ancestor in 0..col {
                        assert_eq!(grid[row][ancestor].content, grid[row - 1][ancestor].content);
                    }
                }
            }
        }
    }

    #[test]
    fn both_merges_rectangles() {
        let map = plan(&sample(), MergeMode::Both, &[]);
        let block = map.span_at(1, 2);
        assert_eq!(
            block,
            &Span {
                row: 0,
                col: 1,
                rows: 2,
                cols: 2
            }
        );
        assert!(map.joins_right(1, 1));
        assert!(map.joins_down(0, 2));
        // "B B" on row 2 does not line up with the single "B" below it.
        assert!(!map.joins_down(2, 1));
    }

    #[test]
    fn row_local_modes() {
        assert_eq!(MergeMode::Both.row_local(), MergeMode::Horizontal);
        assert_eq!(MergeMode::Vertical.row_local(), MergeMode::None);
        assert!(!MergeMode::Horizontal.crosses_rows());
        assert_eq!("Hierarchical".parse::<MergeMode>(), Ok(MergeMode::Hierarchical));
    }

    #[test]
    fn unmerged_map_has_one_span_per_cell() {
        let map = SpanMap::unmerged(3, 2);
        assert_eq!(map.spans().len(), 6);
        assert_eq!(map.rows(), 3);
    }
}
