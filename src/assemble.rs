//! Grid assembly: widths, wrapped cells and spans in, line records out.
//!
//! Line records are the only thing renderers see. A separator record names
//! every horizontal segment and every joint (with the arms meeting there), so
//! a backend only picks glyphs; a content record carries fully padded text.

use crate::cell::{prepare_row, Cell, CellSpec, Prepared, Row, RowPosition};
use crate::config::{Align, Borders, Section, SectionConfig, Separators, Symbols};
use crate::merge::{self, SpanMap};
use crate::width::{display_width, WidthCache};
use crate::wrap::Wrapper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorKind {
    Top,
    Header,
    Row,
    Footer,
    Bottom,
}

/// One horizontal stretch of a separator line, the full outer width of a
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Draw a rule.
    Rule(usize),
    /// A vertical span passes through; leave the cell area open.
    Through(usize),
}

impl Segment {
    pub fn width(&self) -> usize {
        match self {
            Segment::Rule(width) | Segment::Through(width) => *width,
        }
    }
}

/// Which lines meet at a junction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Joint {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatorLine {
    pub kind: SeparatorKind,
    pub segments: Vec<Segment>,
    /// `segments.len() + 1` slots; `None` where no vertical line can exist.
    pub joints: Vec<Option<Joint>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalPosition {
    None,
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCell {
    /// First visible column covered.
    pub col: usize,
    pub cols: usize,
    /// Rows covered by the span this cell belongs to.
    pub rows: usize,
    /// Display width of `text`.
    pub width: usize,
    /// Padded, aligned text filling `width`.
    pub text: String,
    /// The bare line, without padding or alignment.
    pub content: String,
    pub align: Align,
    pub vertical: VerticalPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    pub section: Section,
    /// Row index within its section.
    pub row: usize,
    /// Physical line within the row.
    pub line: usize,
    pub height: usize,
    pub cells: Vec<ContentCell>,
    pub left: bool,
    pub right: bool,
    /// Whether a bar separates neighbouring cells.
    pub inner: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRecord {
    Separator(SeparatorLine),
    Content(ContentLine),
}

/// Frozen horizontal geometry shared by every record of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Outer width (content plus padding) per visible column.
    pub outer: Vec<usize>,
    pub borders: Borders,
    pub separators: Separators,
}

impl Frame {
    pub fn new(outer: Vec<usize>, borders: Borders, separators: Separators) -> Self {
        Self {
            outer,
            borders,
            separators,
        }
    }

    pub fn columns(&self) -> usize {
        self.outer.len()
    }

    fn separator_width(&self) -> usize {
        usize::from(self.separators.between_columns)
    }

    /// Width of `cols` columns drawn as one, absorbing the bars between them.
    pub fn span_outer(&self, col: usize, cols: usize) -> usize {
        let inner: usize = self.outer[col..col + cols].iter().sum();
        inner + self.separator_width() * cols.saturating_sub(1)
    }

    /// Whether any row could draw a vertical line at boundary `pos`.
    fn has_bar_slot(&self, pos: usize) -> bool {
        if pos == 0 {
            self.borders.left
        } else if pos == self.columns() {
            self.borders.right
        } else {
            self.separators.between_columns
        }
    }

    /// Total rendered width of a line.
    pub fn total_width(&self) -> usize {
        let columns = self.columns();
        let bars = (0..=columns).filter(|&pos| self.has_bar_slot(pos)).count();
        self.outer.iter().sum::<usize>() + bars
    }
}

/// Which neighbouring cells of one row are joined horizontally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowShape {
    joined: Vec<bool>,
}

impl RowShape {
    pub fn of(spans: &SpanMap, row: usize, columns: usize) -> Self {
        Self {
            joined: (0..columns.saturating_sub(1))
                .map(|col| spans.joins_right(row, col))
                .collect(),
        }
    }

    fn has_bar(&self, frame: &Frame, pos: usize) -> bool {
        if pos == 0 || pos == frame.columns() {
            frame.has_bar_slot(pos)
        } else {
            frame.has_bar_slot(pos) && !self.joined[pos - 1]
        }
    }
}

/// Builds one separator line between `above` and `below`.
///
/// `through[col]` marks columns where a vertical span continues across.
pub fn separator(
    kind: SeparatorKind,
    frame: &Frame,
    above: Option<&RowShape>,
    below: Option<&RowShape>,
    through: &[bool],
) -> SeparatorLine {
    let columns = frame.columns();
    let open = |col: usize| through.get(col).copied().unwrap_or(false);
    let segments = (0..columns)
        .map(|col| {
            if open(col) {
                Segment::Through(frame.outer[col])
            } else {
                Segment::Rule(frame.outer[col])
            }
        })
        .collect();
    let joints = (0..=columns)
        .map(|pos| {
            frame.has_bar_slot(pos).then(|| Joint {
                up: above.map(|shape| shape.has_bar(frame, pos)).unwrap_or(false),
                down: below.map(|shape| shape.has_bar(frame, pos)).unwrap_or(false),
                left: pos > 0 && !open(pos - 1),
                right: pos < columns && !open(pos),
            })
        })
        .collect();
    SeparatorLine {
        kind,
        segments,
        joints,
    }
}

/// The separator, if any, drawn between two consecutive rows.
pub fn boundary(
    previous: Section,
    next: Section,
    same_block: bool,
    separators: &Separators,
) -> Option<SeparatorKind> {
    if same_block {
        return separators.between_rows.then_some(SeparatorKind::Row);
    }
    match (previous, next) {
        (Section::Header, _) => separators.header_line.then_some(SeparatorKind::Header),
        (_, Section::Footer) => separators.footer_line.then_some(SeparatorKind::Footer),
        _ => separators.between_rows.then_some(SeparatorKind::Row),
    }
}

/// A section's rows after merge planning and wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionGrid {
    pub section: Section,
    pub rows: Vec<Row>,
    pub spans: SpanMap,
}

impl SectionGrid {
    /// Plans merges and wraps every span anchor to the width of its span.
    ///
    /// `prepared` holds visible columns only; `filter` uses visible indices.
    pub fn build(
        section: Section,
        config: &SectionConfig,
        prepared: Vec<Vec<Prepared>>,
        filter: &[usize],
        frame: &Frame,
        symbols: &Symbols,
        cache: &WidthCache,
    ) -> Self {
        let inputs: Vec<_> = prepared
            .iter()
            .map(|row| row.iter().map(Prepared::merge_input).collect())
            .collect();
        let spans = merge::plan(&inputs, config.merge.mode, filter);
        tracing::debug!(
            %section,
            rows = prepared.len(),
            spans = spans.spans().len(),
            "planned merges"
        );
        let wrapper = Wrapper::new(config.wrap, symbols);
        let count = prepared.len();
        let rows = prepared
            .into_iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let cells = row
                    .into_iter()
                    .enumerate()
                    .map(|(col, prepared)| {
                        let span = spans.span_at(row_idx, col);
                        if span.is_anchor(row_idx, col) {
                            let available = frame
                                .span_outer(span.col, span.cols)
                                .saturating_sub(prepared.padding.horizontal());
                            Cell::wrapped(prepared, available, &wrapper, cache)
                        } else {
                            Cell::filler(prepared)
                        }
                    })
                    .collect();
                Row {
                    section,
                    position: RowPosition::of(row_idx, count),
                    cells,
                }
            })
            .collect();
        Self {
            section,
            rows,
            spans,
        }
    }

    /// A one-row grid as the stream emits it: merging never looks past the
    /// row itself.
    pub fn single(
        section: Section,
        config: &SectionConfig,
        specs: &[CellSpec],
        frame: &Frame,
        symbols: &Symbols,
        cache: &WidthCache,
    ) -> Self {
        let row = prepare_row(section, config, specs, frame.columns());
        let mut local = config.clone();
        local.merge.mode = config.merge.mode.row_local();
        Self::build(
            section,
            &local,
            vec![row],
            &config.merge.columns,
            frame,
            symbols,
            cache,
        )
    }

    pub fn shape(&self, row: usize) -> RowShape {
        RowShape::of(&self.spans, row, self.columns())
    }

    fn columns(&self) -> usize {
        self.rows.first().map(|row| row.cells.len()).unwrap_or(0)
    }

    /// Lines a row occupies: its tallest span anchor.
    pub fn row_height(&self, row: usize) -> usize {
        self.rows[row]
            .cells
            .iter()
            .enumerate()
            .filter(|(col, _)| self.spans.span_at(row, *col).is_anchor(row, *col))
            .map(|(_, cell)| cell.height())
            .max()
            .unwrap_or(0)
            .max(1)
    }

    /// Content records for one row.
    pub fn row_lines(&self, row: usize, frame: &Frame) -> Vec<LineRecord> {
        let height = self.row_height(row);
        let columns = self.columns();
        let mut records = Vec::with_capacity(height);
        for line in 0..height {
            let mut cells = Vec::new();
            let mut col = 0;
            while col < columns {
                let span = *self.spans.span_at(row, col);
                let width = frame.span_outer(span.col, span.cols);
                let vertical = if span.rows == 1 {
                    VerticalPosition::None
                } else if span.row == row {
                    VerticalPosition::Top
                } else if span.last_row() == row {
                    VerticalPosition::Bottom
                } else {
                    VerticalPosition::Middle
                };
                let anchor = &self.rows[span.row].cells[span.col];
                let (text, content) = if span.row == row {
                    compose(anchor, line, height, width)
                } else {
                    (" ".repeat(width), String::new())
                };
                cells.push(ContentCell {
                    col: span.col,
                    cols: span.cols,
                    rows: span.rows,
                    width,
                    text,
                    content,
                    align: anchor.align,
                    vertical,
                });
                col = span.col + span.cols;
            }
            records.push(LineRecord::Content(ContentLine {
                section: self.section,
                row,
                line,
                height,
                cells,
                left: frame.borders.left,
                right: frame.borders.right,
                inner: frame.separators.between_columns,
            }));
        }
        records
    }
}

/// Keeps only the visible columns of a full-width row.
pub fn project<T>(row: Vec<T>, visible: &[usize]) -> Vec<T> {
    row.into_iter()
        .enumerate()
        .filter(|(col, _)| visible.contains(col))
        .map(|(_, cell)| cell)
        .collect()
}

/// Maps a merge column filter from table columns onto visible columns.
pub fn project_filter(filter: &[usize], visible: &[usize]) -> Vec<usize> {
    let mut projected: Vec<usize> = filter
        .iter()
        .filter_map(|col| visible.iter().position(|visible| visible == col))
        .collect();
    if !filter.is_empty() && projected.is_empty() {
        // Every listed column is hidden; nothing may merge.
        projected.push(usize::MAX);
    }
    projected
}

/// Text for physical line `line` of a cell drawn `width` columns wide.
fn compose(cell: &Cell, line: usize, height: usize, width: usize) -> (String, String) {
    let padding = &cell.padding;
    let top = usize::from(!padding.top.is_empty());
    if top == 1 && line == 0 {
        return (fill(&padding.top, width), String::new());
    }
    if !padding.bottom.is_empty() && line + 1 == height {
        return (fill(&padding.bottom, width), String::new());
    }
    let content = cell
        .lines
        .get(line - top)
        .cloned()
        .unwrap_or_default();
    let available = width.saturating_sub(padding.horizontal());
    let aligned = align_text(&content, available, cell.align);
    let text = format!("{}{}{}", padding.left, aligned, padding.right);
    (text, content)
}

fn align_text(text: &str, width: usize, align: Align) -> String {
    let display = display_width(text);
    if display >= width {
        return text.to_string();
    }
    let padding = width - display;
    match align {
        Align::Right => format!("{}{}", " ".repeat(padding), text),
        Align::Center => {
            let left = padding / 2;
            let right = padding - left;
            format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
        }
        Align::Left | Align::Skip => format!("{}{}", text, " ".repeat(padding)),
    }
}

/// Repeats `glyph` across `width` columns, topping up with spaces.
fn fill(glyph: &str, width: usize) -> String {
    let glyph_width = display_width(glyph);
    if glyph_width == 0 {
        return " ".repeat(width);
    }
    let count = width / glyph_width;
    let mut out = glyph.repeat(count);
    out.push_str(&" ".repeat(width - count * glyph_width));
    out
}

/// Builds every record of a buffered table in top-to-bottom order.
pub fn assemble(sections: &[&SectionGrid], frame: &Frame) -> Vec<LineRecord> {
    let mut records = Vec::new();
    if frame.columns() == 0 {
        return records;
    }
    let blocks: Vec<&SectionGrid> = sections
        .iter()
        .copied()
        .filter(|grid| !grid.rows.is_empty())
        .collect();
    let mut previous: Option<(Section, RowShape)> = None;
    for grid in &blocks {
        for row in 0..grid.rows.len() {
            let shape = grid.shape(row);
            match &previous {
                None => {
                    if frame.borders.top {
                        records.push(LineRecord::Separator(separator(
                            SeparatorKind::Top,
                            frame,
                            None,
                            Some(&shape),
                            &[],
                        )));
                    }
                }
                Some((section, above)) => {
                    let same_block = row > 0;
                    if let Some(kind) = boundary(*section, grid.section, same_block, &frame.separators) {
                        let through: Vec<bool> = if same_block {
                            (0..frame.columns())
                                .map(|col| grid.spans.joins_down(row - 1, col))
                                .collect()
                        } else {
                            Vec::new()
                        };
                        records.push(LineRecord::Separator(separator(
                            kind,
                            frame,
                            Some(above),
                            Some(&shape),
                            &through,
                        )));
                    }
                }
            }
            records.extend(grid.row_lines(row, frame));
            previous = Some((grid.section, shape));
        }
    }
    if let Some((_, above)) = &previous {
        if frame.borders.bottom {
            records.push(LineRecord::Separator(separator(
                SeparatorKind::Bottom,
                frame,
                Some(above),
                None,
                &[],
            )));
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Padding, WrapPolicy};
    use crate::merge::MergeMode;
    use pretty_assertions::assert_eq;

    fn frame(outer: Vec<usize>) -> Frame {
        Frame::new(outer, Borders::default(), Separators::default())
    }

    fn prepared(rows: &[&[&str]], config: &SectionConfig, section: Section) -> Vec<Vec<Prepared>> {
        rows.iter()
            .map(|row| {
                let specs: Vec<CellSpec> = row.iter().map(|text| CellSpec::new(*text)).collect();
                prepare_row(section, config, &specs, row.len())
            })
            .collect()
    }

    fn grid(rows: &[&[&str]], config: &SectionConfig, frame: &Frame) -> SectionGrid {
        SectionGrid::build(
            Section::Row,
            config,
            prepared(rows, config, Section::Row),
            &config.merge.columns,
            frame,
            &Symbols::default(),
            &WidthCache::new(16),
        )
    }

    fn contents(records: &[LineRecord]) -> Vec<&ContentLine> {
        records
            .iter()
            .filter_map(|record| match record {
                LineRecord::Content(line) => Some(line),
                LineRecord::Separator(_) => None,
            })
            .collect()
    }

    #[test]
    fn span_outer_absorbs_separators() {
        let frame = frame(vec![3, 4, 5]);
        assert_eq!(frame.span_outer(0, 1), 3);
        assert_eq!(frame.span_outer(0, 3), 14);
        assert_eq!(frame.total_width(), 16);
    }

    #[test]
    fn content_lines_are_padded_to_width() {
        let config = SectionConfig::default();
        let frame = frame(vec![7, 4]);
        let grid = grid(&[&["hello world", "ab"]], &config, &frame);
        let records = grid.row_lines(0, &frame);
        assert_eq!(records.len(), 2);
        let lines = contents(&records);
        assert_eq!(lines[0].cells[0].text, " hello ");
        assert_eq!(lines[1].cells[0].text, " world ");
        assert_eq!(lines[0].cells[1].text, " ab ");
        assert_eq!(lines[1].cells[1].text, "    ");
        for line in lines {
            for cell in &line.cells {
                assert_eq!(display_width(&cell.text), cell.width);
            }
        }
    }

    #[test]
    fn vertical_span_suppresses_interior_rule() {
        let mut config = SectionConfig::default();
        config.merge.mode = MergeMode::Vertical;
        config.merge.columns = vec![0];
        let mut separators = Separators::default();
        separators.between_rows = true;
        let frame = Frame::new(vec![3, 3], Borders::default(), separators);
        let grid = grid(&[&["A", "x"], &["A", "y"]], &config, &frame);
        let records = assemble(&[&grid], &frame);
        let middle = records
            .iter()
            .find_map(|record| match record {
                LineRecord::Separator(line) if line.kind == SeparatorKind::Row => Some(line),
                _ => None,
            })
            .unwrap();
        assert_eq!(middle.segments, vec![Segment::Through(3), Segment::Rule(3)]);
        assert_eq!(
            middle.joints[1],
            Some(Joint {
                up: true,
                down: true,
                left: false,
                right: true
            })
        );
        let lines = contents(&records);
        assert_eq!(lines[0].cells[0].vertical, VerticalPosition::Top);
        assert_eq!(lines[0].cells[0].text, " A ");
        assert_eq!(lines[1].cells[0].vertical, VerticalPosition::Bottom);
        assert_eq!(lines[1].cells[0].text, "   ");
        assert_eq!(lines[1].cells[1].text, " y ");
    }

    #[test]
    fn horizontal_span_widens_the_cell() {
        let mut config = SectionConfig::default();
        config.merge.mode = MergeMode::Horizontal;
        config.alignment.global = Some(Align::Center);
        let frame = frame(vec![3, 3]);
        let grid = grid(&[&["same", "same"]], &config, &frame);
        let lines = grid.row_lines(0, &frame);
        let line = contents(&lines)[0];
        assert_eq!(line.cells.len(), 1);
        assert_eq!(line.cells[0].cols, 2);
        assert_eq!(line.cells[0].text, " same  ");
        let bottom = separator(SeparatorKind::Bottom, &frame, Some(&grid.shape(0)), None, &[]);
        assert_eq!(
            bottom.joints[1],
            Some(Joint {
                up: false,
                down: false,
                left: true,
                right: true
            })
        );
    }

    #[test]
    fn vertical_padding_fills_lines() {
        let mut config = SectionConfig::default();
        config.padding.global = Padding {
            top: "^".into(),
            bottom: "_".into(),
            ..Padding::default()
        };
        let frame = frame(vec![4]);
        let grid = grid(&[&["ab"]], &config, &frame);
        let texts: Vec<String> = contents(&grid.row_lines(0, &frame))
            .iter()
            .map(|line| line.cells[0].text.clone())
            .collect();
        assert_eq!(texts, vec!["^^^^", " ab ", "____"]);
    }

    #[test]
    fn boundaries_follow_separator_flags() {
        let separators = Separators::default();
        assert_eq!(
            boundary(Section::Header, Section::Row, false, &separators),
            Some(SeparatorKind::Header)
        );
        assert_eq!(boundary(Section::Row, Section::Row, true, &separators), None);
        assert_eq!(
            boundary(Section::Row, Section::Footer, false, &separators),
            Some(SeparatorKind::Footer)
        );
        assert_eq!(
            boundary(Section::Header, Section::Footer, false, &separators),
            Some(SeparatorKind::Header)
        );
    }

    #[test]
    fn borderless_frame_has_no_edge_joints() {
        let frame = Frame::new(vec![2, 2], Borders::none(), Separators::default());
        let line = separator(SeparatorKind::Row, &frame, None, None, &[]);
        assert_eq!(line.joints[0], None);
        assert!(line.joints[1].is_some());
        assert_eq!(line.joints[2], None);
    }

    #[test]
    fn truncated_rows_stay_one_line() {
        let mut config = SectionConfig::default();
        config.wrap = WrapPolicy::Truncate;
        let frame = frame(vec![6]);
        let grid = grid(&[&["truncate me"]], &config, &frame);
        let lines = grid.row_lines(0, &frame);
        assert_eq!(lines.len(), 1);
        assert_eq!(contents(&lines)[0].cells[0].text, " tru… ");
    }

    #[test]
    fn filter_projection_skips_hidden_columns() {
        assert_eq!(project_filter(&[0, 2], &[0, 2, 3]), vec![0, 1]);
        assert_eq!(project_filter(&[1], &[0, 2]), vec![usize::MAX]);
        assert!(project_filter(&[], &[0]).is_empty());
        assert_eq!(project(vec!['a', 'b', 'c'], &[0, 2]), vec!['a', 'c']);
    }
}
