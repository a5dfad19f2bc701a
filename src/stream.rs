//! Row-at-a-time rendering against a width plan frozen before the first row.

use std::io::Write;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::assemble::{boundary, separator, Frame, LineRecord, RowShape, SectionGrid, SeparatorKind};
use crate::cell::{prepare_row, CellSpec};
use crate::config::{Section, TableConfig, WidthInference};
use crate::error::TableError;
use crate::render::Renderer;
use crate::resolve::{resolve, Overhead, WidthPlan};
use crate::width::{global_cache, WidthCache};
use crate::wrap::unwrapped;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    NotStarted,
    Started,
    HeaderEmitted,
    RowsEmitted,
    FooterEmitted,
    Closed,
}

impl StreamState {
    fn name(self) -> &'static str {
        match self {
            StreamState::NotStarted => "not started",
            StreamState::Started => "start",
            StreamState::HeaderEmitted => "header",
            StreamState::RowsEmitted => "rows",
            StreamState::FooterEmitted => "footer",
            StreamState::Closed => "close",
        }
    }

    fn accepts(self, section: Section) -> bool {
        match section {
            Section::Header => self == StreamState::Started,
            Section::Row | Section::Footer => matches!(
                self,
                StreamState::Started | StreamState::HeaderEmitted | StreamState::RowsEmitted
            ),
        }
    }

    fn after(section: Section) -> Self {
        match section {
            Section::Header => StreamState::HeaderEmitted,
            Section::Row => StreamState::RowsEmitted,
            Section::Footer => StreamState::FooterEmitted,
        }
    }
}

fn block_name(section: Section) -> &'static str {
    match section {
        Section::Header => "header",
        Section::Row => "row",
        Section::Footer => "footer",
    }
}

/// Streams line records to `out` as rows arrive.
///
/// Merging is row-local: a vertical merge would have to look at rows that
/// have not been appended yet.
pub struct TableStream<W: Write, R: Renderer> {
    config: TableConfig,
    renderer: R,
    out: W,
    cache: Arc<WidthCache>,
    state: StreamState,
    frame: Option<Frame>,
    previous: Option<(Section, RowShape)>,
}

impl<W: Write, R: Renderer> TableStream<W, R> {
    pub fn new(config: TableConfig, renderer: R, out: W) -> Self {
        Self {
            config,
            renderer,
            out,
            cache: global_cache(),
            state: StreamState::NotStarted,
            frame: None,
            previous: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<WidthCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Checks that widths can be known before any row and opens the output.
    pub fn start(&mut self) -> Result<(), TableError> {
        if self.state != StreamState::NotStarted {
            return Err(TableError::AlreadyStarted);
        }
        let widths = self.config.stream.widths.clone();
        if widths.is_empty() && self.config.stream.inference == WidthInference::None {
            return Err(TableError::UndeterminedWidths);
        }
        if !widths.is_empty() {
            self.config.validate(widths.len())?;
            let plan = WidthPlan::fixed(&widths, &self.overhead(widths.len()));
            self.frame = Some(self.frame_for(&plan));
        }
        for (section, config) in [
            (Section::Header, &self.config.header),
            (Section::Row, &self.config.row),
            (Section::Footer, &self.config.footer),
        ] {
            if config.merge.mode.crosses_rows() {
                warn!(
                    %section,
                    mode = ?config.merge.mode,
                    "merging across rows is not possible while streaming; merging within rows only"
                );
            }
        }
        self.renderer.begin(&mut self.out)?;
        self.state = StreamState::Started;
        Ok(())
    }

    pub fn header<I, C>(&mut self, cells: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = C>,
        C: Into<CellSpec>,
    {
        self.emit(Section::Header, cells.into_iter().map(Into::into).collect())
    }

    pub fn append<I, C>(&mut self, cells: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = C>,
        C: Into<CellSpec>,
    {
        self.emit(Section::Row, cells.into_iter().map(Into::into).collect())
    }

    pub fn footer<I, C>(&mut self, cells: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = C>,
        C: Into<CellSpec>,
    {
        self.emit(Section::Footer, cells.into_iter().map(Into::into).collect())
    }

    /// Draws the bottom border and closes the output.
    pub fn close(&mut self) -> Result<(), TableError> {
        match self.state {
            StreamState::NotStarted => return Err(TableError::NotStarted),
            StreamState::Closed => return Err(TableError::Closed),
            _ => {}
        }
        if let (Some(frame), Some((_, above))) = (&self.frame, &self.previous) {
            if frame.borders.bottom {
                let bottom = separator(SeparatorKind::Bottom, frame, Some(above), None, &[]);
                self.renderer
                    .line(&LineRecord::Separator(bottom), &mut self.out)?;
            }
        }
        self.renderer.finish(&mut self.out)?;
        self.out.flush()?;
        self.state = StreamState::Closed;
        Ok(())
    }

    fn overhead(&self, columns: usize) -> Overhead {
        Overhead {
            padding: (0..columns).map(|col| self.config.max_padding(col)).collect(),
            column_separator: usize::from(self.config.separators.between_columns),
            left_border: usize::from(self.config.borders.left),
            right_border: usize::from(self.config.borders.right),
        }
    }

    fn frame_for(&self, plan: &WidthPlan) -> Frame {
        Frame::new(
            plan.outer.clone(),
            self.config.borders,
            self.config.separators,
        )
    }

    /// Freezes widths from the first block when inference is on.
    fn infer_widths(&mut self, section: Section, specs: &[CellSpec]) -> Result<(), TableError> {
        let columns = specs.len();
        self.config.validate(columns)?;
        let config = self.config.section(section);
        let prepared = prepare_row(section, config, specs, columns);
        let samples = vec![prepared
            .iter()
            .map(|cell| unwrapped(&cell.content, config.wrap))
            .collect::<Vec<String>>()];
        // A column hidden now could not reappear for later rows.
        let mut widths = self.config.widths.clone();
        widths.auto_hide = false;
        let plan = resolve(
            &samples,
            columns,
            &widths,
            &self.overhead(columns),
            &self.cache,
        );
        self.frame = Some(self.frame_for(&plan));
        Ok(())
    }

    fn emit(&mut self, section: Section, specs: Vec<CellSpec>) -> Result<(), TableError> {
        match self.state {
            StreamState::NotStarted => return Err(TableError::NotStarted),
            StreamState::Closed => return Err(TableError::Closed),
            state if !state.accepts(section) => {
                return Err(TableError::OutOfOrder {
                    block: block_name(section),
                    state: state.name(),
                })
            }
            _ => {}
        }
        if self.frame.is_none() {
            self.infer_widths(section, &specs)?;
        }
        let Some(frame) = self.frame.as_ref() else {
            return Err(TableError::UndeterminedWidths);
        };
        if specs.len() > frame.columns() {
            return Err(TableError::RowTooWide {
                expected: frame.columns(),
                found: specs.len(),
            });
        }

        let grid = SectionGrid::single(
            section,
            self.config.section(section),
            &specs,
            frame,
            &self.config.symbols,
            &self.cache,
        );
        let shape = grid.shape(0);
        let mut records = Vec::new();
        match &self.previous {
            None if frame.borders.top => records.push(LineRecord::Separator(separator(
                SeparatorKind::Top,
                frame,
                None,
                Some(&shape),
                &[],
            ))),
            None => {}
            Some((previous, above)) => {
                let same_block = *previous == section;
                if let Some(kind) = boundary(*previous, section, same_block, &frame.separators) {
                    records.push(LineRecord::Separator(separator(
                        kind,
                        frame,
                        Some(above),
                        Some(&shape),
                        &[],
                    )));
                }
            }
        }
        records.extend(grid.row_lines(0, frame));
        trace!(%section, lines = records.len(), "streamed row");
        // A row reaches `out` whole or not at all.
        let mut buffer = Vec::new();
        for record in &records {
            self.renderer.line(record, &mut buffer)?;
        }
        self.out.write_all(&buffer)?;
        self.previous = Some((section, shape));
        self.state = StreamState::after(section);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::config::Align;
    use crate::merge::MergeMode;
    use crate::render::{BorderStyle, HtmlRenderer, TextRenderer};
    use crate::table::Table;
    use crate::width::display_width;
    use pretty_assertions::assert_eq;

    fn streaming(widths: Vec<usize>) -> TableConfig {
        let mut config = TableConfig::default();
        config.stream.enabled = true;
        config.stream.widths = widths;
        config
    }

    fn text_stream(config: TableConfig) -> TableStream<Vec<u8>, TextRenderer> {
        TableStream::new(config, TextRenderer::new(BorderStyle::LIGHT), Vec::new())
            .with_cache(Arc::new(WidthCache::new(32)))
    }

    fn output(stream: TableStream<Vec<u8>, TextRenderer>) -> String {
        String::from_utf8(stream.into_inner()).unwrap()
    }

    const ROWS: [[&str; 3]; 2] = [["Alice", "25", "New York"], ["Bob", "30", "Boston"]];

    #[test]
    fn matches_buffered_output_with_fixed_widths() {
        for between_rows in [false, true] {
            let mut config = streaming(vec![5, 3, 8]);
            config.separators.between_rows = between_rows;
            let mut stream = text_stream(config.clone());
            stream.start().unwrap();
            stream.header(["Name", "Age", "City"]).unwrap();
            for row in ROWS {
                stream.append(row).unwrap();
            }
            stream.footer(["", "", "2 rows"]).unwrap();
            stream.close().unwrap();

            config.stream.enabled = false;
            config.widths.fixed = vec![Some(5), Some(3), Some(8)];
            let mut table = Table::new(config);
            table.header(["Name", "Age", "City"]);
            table.append_bulk(ROWS);
            table.footer(["", "", "2 rows"]);
            let buffered = table
                .render_to_string(&mut TextRenderer::new(BorderStyle::LIGHT))
                .unwrap();
            assert_eq!(output(stream), buffered);
        }
    }

    #[test]
    fn wraps_against_frozen_widths() {
        let mut stream = text_stream(streaming(vec![4, 3]));
        stream.start().unwrap();
        stream.append(["long text", "1"]).unwrap();
        stream.close().unwrap();
        let expected = "\
┌──────┬─────┐
│ long │ 1   │
│ text │     │
└──────┴─────┘
";
        assert_eq!(output(stream), expected);
    }

    #[test]
    fn first_row_freezes_widths() {
        let mut config = TableConfig::default();
        config.stream.inference = WidthInference::FirstRow;
        let mut stream = text_stream(config);
        stream.start().unwrap();
        stream.header(["Name", "City"]).unwrap();
        stream.append(["Alice", "New York"]).unwrap();
        stream.close().unwrap();
        let out = output(stream);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "┌──────┬──────┐");
        assert_eq!(lines[3], "│ Alic │ New  │");
        assert!(lines.iter().all(|line| display_width(line) == 15));
    }

    #[test]
    fn start_needs_widths() {
        let mut stream = text_stream(TableConfig::default());
        assert!(matches!(stream.start(), Err(TableError::UndeterminedWidths)));
        assert_eq!(stream.state(), StreamState::NotStarted);
    }

    #[test]
    fn start_validates_per_column_lists() {
        let mut config = streaming(vec![3, 3]);
        config.row.alignment.per_column = vec![Some(Align::Right)];
        let mut stream = text_stream(config);
        assert!(matches!(
            stream.start(),
            Err(TableError::ColumnCountMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn state_errors_are_explicit() {
        let mut stream = text_stream(streaming(vec![3]));
        assert!(matches!(stream.append(["a"]), Err(TableError::NotStarted)));
        assert!(matches!(stream.close(), Err(TableError::NotStarted)));
        stream.start().unwrap();
        assert!(matches!(stream.start(), Err(TableError::AlreadyStarted)));
        stream.append(["a"]).unwrap();
        assert_eq!(stream.state(), StreamState::RowsEmitted);
        assert!(matches!(
            stream.header(["h"]),
            Err(TableError::OutOfOrder { block: "header", state: "rows" })
        ));
        stream.footer(["f"]).unwrap();
        assert!(matches!(
            stream.append(["b"]),
            Err(TableError::OutOfOrder { block: "row", state: "footer" })
        ));
        stream.close().unwrap();
        assert!(matches!(stream.close(), Err(TableError::Closed)));
        assert!(matches!(stream.append(["c"]), Err(TableError::Closed)));
        assert_eq!(stream.state(), StreamState::Closed);
    }

    #[test]
    fn failed_emission_keeps_written_output() {
        let mut stream = text_stream(streaming(vec![3]));
        stream.start().unwrap();
        stream.append(["a"]).unwrap();
        assert!(matches!(
            stream.append(["a", "b"]),
            Err(TableError::RowTooWide { expected: 1, found: 2 })
        ));
        stream.close().unwrap();
        let expected = "\
┌─────┐
│ a   │
└─────┘
";
        assert_eq!(output(stream), expected);
    }

    /// Text renderer that refuses any content line mentioning "boom".
    struct Refusing(TextRenderer);

    impl Renderer for Refusing {
        fn line(&mut self, record: &LineRecord, out: &mut dyn Write) -> io::Result<()> {
            if let LineRecord::Content(line) = record {
                if line.cells.iter().any(|cell| cell.content.contains("boom")) {
                    return Err(io::Error::new(io::ErrorKind::Other, "refused"));
                }
            }
            self.0.line(record, out)
        }
    }

    #[test]
    fn renderer_failure_writes_nothing_for_the_row() {
        let mut config = streaming(vec![3]);
        config.separators.between_rows = true;
        let mut stream = TableStream::new(
            config,
            Refusing(TextRenderer::new(BorderStyle::LIGHT)),
            Vec::new(),
        );
        stream.start().unwrap();
        stream.append(["a"]).unwrap();
        assert!(matches!(stream.append(["boom"]), Err(TableError::Io(_))));
        assert_eq!(stream.state(), StreamState::RowsEmitted);
        stream.append(["c"]).unwrap();
        stream.close().unwrap();
        let expected = "\
┌─────┐
│ a   │
├─────┤
│ c   │
└─────┘
";
        assert_eq!(String::from_utf8(stream.into_inner()).unwrap(), expected);
    }

    #[test]
    fn vertical_merge_degrades_to_single_rows() {
        let mut config = streaming(vec![1, 1]);
        config.row.merge.mode = MergeMode::Both;
        let mut stream = text_stream(config);
        stream.start().unwrap();
        stream.append(["x", "x"]).unwrap();
        stream.append(["x", "x"]).unwrap();
        stream.close().unwrap();
        let expected = "\
┌───────┐
│ x     │
│ x     │
└───────┘
";
        assert_eq!(output(stream), expected);
    }

    #[test]
    fn html_stream_is_wrapped_in_table() {
        let mut stream = TableStream::new(streaming(vec![2]), HtmlRenderer::default(), Vec::new());
        stream.start().unwrap();
        stream.append(["hi"]).unwrap();
        stream.close().unwrap();
        let out = String::from_utf8(stream.into_inner()).unwrap();
        assert!(out.starts_with("<table>\n"));
        assert!(out.contains("<td>hi</td>"));
        assert!(out.ends_with("</tbody>\n</table>\n"));
    }

    #[test]
    fn table_can_start_a_stream() {
        let mut table = Table::new(streaming(vec![2]));
        table.append(["ignored"]);
        let mut stream = table
            .stream(TextRenderer::new(BorderStyle::ASCII), Vec::new())
            .unwrap();
        assert_eq!(stream.state(), StreamState::Started);
        stream.append(["ok"]).unwrap();
        stream.close().unwrap();
        assert_eq!(
            String::from_utf8(stream.into_inner()).unwrap(),
            "+----+\n| ok |\n+----+\n"
        );
    }
}
