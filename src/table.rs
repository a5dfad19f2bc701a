//! Buffered tables: collect every row, then lay the whole thing out at once.

use std::io::Write;
use std::sync::Arc;

use crate::assemble::{assemble, project, project_filter, Frame, LineRecord, SectionGrid};
use crate::cell::{prepare_row, CellSpec, Prepared};
use crate::config::{Section, TableConfig};
use crate::error::TableError;
use crate::render::{render_all, Renderer};
use crate::resolve::{resolve, Overhead, WidthPlan};
use crate::stream::TableStream;
use crate::width::{global_cache, WidthCache};
use crate::wrap::unwrapped;

/// Table-building surface. Not meant to be shared between threads while rows
/// are still being added.
#[derive(Debug, Clone)]
pub struct Table {
    config: TableConfig,
    header: Option<Vec<CellSpec>>,
    rows: Vec<Vec<CellSpec>>,
    footer: Option<Vec<CellSpec>>,
    cache: Arc<WidthCache>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new(TableConfig::default())
    }
}

fn collect<I, C>(cells: I) -> Vec<CellSpec>
where
    I: IntoIterator<Item = C>,
    C: Into<CellSpec>,
{
    cells.into_iter().map(Into::into).collect()
}

impl Table {
    pub fn new(config: TableConfig) -> Self {
        Self {
            config,
            header: None,
            rows: Vec::new(),
            footer: None,
            cache: global_cache(),
        }
    }

    /// Uses `cache` instead of the process-wide width cache.
    pub fn with_cache(mut self, cache: Arc<WidthCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TableConfig {
        &mut self.config
    }

    pub fn header<I, C>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CellSpec>,
    {
        self.header = Some(collect(cells));
        self
    }

    pub fn append<I, C>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CellSpec>,
    {
        self.rows.push(collect(cells));
        self
    }

    pub fn append_bulk<R, I, C>(&mut self, rows: R) -> &mut Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = C>,
        C: Into<CellSpec>,
    {
        for row in rows {
            self.append(row);
        }
        self
    }

    pub fn footer<I, C>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CellSpec>,
    {
        self.footer = Some(collect(cells));
        self
    }

    pub fn columns(&self) -> usize {
        self.header
            .iter()
            .chain(self.rows.iter())
            .chain(self.footer.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    fn overhead(&self, columns: usize) -> Overhead {
        Overhead {
            padding: (0..columns).map(|col| self.config.max_padding(col)).collect(),
            column_separator: usize::from(self.config.separators.between_columns),
            left_border: usize::from(self.config.borders.left),
            right_border: usize::from(self.config.borders.right),
        }
    }

    fn prepared(&self, section: Section, rows: &[Vec<CellSpec>], columns: usize) -> Vec<Vec<Prepared>> {
        let config = self.config.section(section);
        rows.iter()
            .map(|row| prepare_row(section, config, row, columns))
            .collect()
    }

    /// Resolves the width plan the table would render with.
    pub fn width_plan(&self) -> Result<WidthPlan, TableError> {
        let columns = self.columns();
        self.config.validate(columns)?;
        let sections = self.prepared_sections(columns);
        Ok(self.resolve_widths(&sections, columns))
    }

    fn prepared_sections(&self, columns: usize) -> [(Section, Vec<Vec<Prepared>>); 3] {
        let header: Vec<Vec<CellSpec>> = self.header.iter().cloned().collect();
        let footer: Vec<Vec<CellSpec>> = self.footer.iter().cloned().collect();
        [
            (Section::Header, self.prepared(Section::Header, &header, columns)),
            (Section::Row, self.prepared(Section::Row, &self.rows, columns)),
            (Section::Footer, self.prepared(Section::Footer, &footer, columns)),
        ]
    }

    fn resolve_widths(&self, sections: &[(Section, Vec<Vec<Prepared>>)], columns: usize) -> WidthPlan {
        let samples: Vec<Vec<String>> = sections
            .iter()
            .flat_map(|(section, rows)| {
                let policy = self.config.section(*section).wrap;
                rows.iter().map(move |row| {
                    row.iter()
                        .map(|cell| unwrapped(&cell.content, policy))
                        .collect::<Vec<String>>()
                })
            })
            .collect();
        resolve(
            &samples,
            columns,
            &self.config.widths,
            &self.overhead(columns),
            &self.cache,
        )
    }

    /// Lays the table out into line records.
    pub fn records(&self) -> Result<Vec<LineRecord>, TableError> {
        let columns = self.columns();
        self.config.validate(columns)?;
        let sections = self.prepared_sections(columns);
        let plan = self.resolve_widths(&sections, columns);
        let visible = plan.visible();
        let frame = Frame::new(
            visible.iter().map(|&col| plan.outer[col]).collect(),
            self.config.borders,
            self.config.separators,
        );
        let grids: Vec<SectionGrid> = sections
            .into_iter()
            .map(|(section, rows)| {
                let config = self.config.section(section);
                let rows = rows.into_iter().map(|row| project(row, &visible)).collect();
                let filter = project_filter(&config.merge.columns, &visible);
                SectionGrid::build(
                    section,
                    config,
                    rows,
                    &filter,
                    &frame,
                    &self.config.symbols,
                    &self.cache,
                )
            })
            .collect();
        let refs: Vec<&SectionGrid> = grids.iter().collect();
        Ok(assemble(&refs, &frame))
    }

    /// Paints the table. With `stream.enabled` set, rows go through a
    /// [`TableStream`] one at a time instead, so merging stays row-local.
    pub fn render<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        out: &mut dyn Write,
    ) -> Result<(), TableError> {
        if self.config.stream.enabled {
            return self.render_streamed(renderer, out);
        }
        let records = self.records()?;
        render_all(renderer, &records, out)?;
        Ok(())
    }

    pub fn render_to_string<R: Renderer + ?Sized>(&self, renderer: &mut R) -> Result<String, TableError> {
        let mut buffer = Vec::new();
        self.render(renderer, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn render_streamed<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        out: &mut dyn Write,
    ) -> Result<(), TableError> {
        let mut stream = self.stream(renderer, out)?;
        if let Some(header) = &self.header {
            stream.header(header.iter().cloned())?;
        }
        for row in &self.rows {
            stream.append(row.iter().cloned())?;
        }
        if let Some(footer) = &self.footer {
            stream.footer(footer.iter().cloned())?;
        }
        stream.close()
    }

    /// Starts a stream with this table's configuration and cache.
    pub fn stream<W: Write, R: Renderer>(&self, renderer: R, out: W) -> Result<TableStream<W, R>, TableError> {
        let mut stream = TableStream::new(self.config.clone(), renderer, out)
            .with_cache(Arc::clone(&self.cache));
        stream.start()?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::ContentLine;
    use crate::config::{Align, WrapPolicy};
    use crate::merge::MergeMode;
    use crate::render::{BorderStyle, HtmlRenderer, MarkdownRenderer, TextRenderer};
    use crate::width::display_width;
    use pretty_assertions::assert_eq;

    fn text(table: &Table) -> String {
        table
            .render_to_string(&mut TextRenderer::new(BorderStyle::LIGHT))
            .unwrap()
    }

    fn people() -> Table {
        let mut table = Table::default().with_cache(Arc::new(WidthCache::new(64)));
        table.header(["Name", "Age", "City"]);
        table.append(["Alice", "25", "New York"]);
        table.append(["Bob", "30", "Boston"]);
        table
    }

    #[test]
    fn renders_default_table() {
        let expected = "\
┌───────┬─────┬──────────┐
│ NAME  │ AGE │   CITY   │
├───────┼─────┼──────────┤
│ Alice │ 25  │ New York │
│ Bob   │ 30  │ Boston   │
└───────┴─────┴──────────┘
";
        assert_eq!(text(&people()), expected);
    }

    #[test]
    fn ascii_style_and_row_separators() {
        let mut table = people();
        table.config_mut().separators.between_rows = true;
        let out = table
            .render_to_string(&mut TextRenderer::new(BorderStyle::ASCII))
            .unwrap();
        let expected = "\
+-------+-----+----------+
| NAME  | AGE |   CITY   |
+-------+-----+----------+
| Alice | 25  | New York |
+-------+-----+----------+
| Bob   | 30  | Boston   |
+-------+-----+----------+
";
        assert_eq!(out, expected);
    }

    #[test]
    fn vertical_merge_keeps_rule_for_other_columns() {
        let mut table = Table::default();
        table.config_mut().row.merge.mode = MergeMode::Vertical;
        table.config_mut().row.merge.columns = vec![0];
        table.config_mut().separators.between_rows = true;
        table.append(["A", "x"]).append(["A", "y"]);
        let expected = "\
┌───┬───┐
│ A │ x │
│   ├───┤
│   │ y │
└───┴───┘
";
        assert_eq!(text(&table), expected);
    }

    #[test]
    fn horizontal_merge_drops_inner_bar() {
        let mut table = Table::default();
        table.config_mut().row.merge.mode = MergeMode::Horizontal;
        table.append([
            CellSpec::new("total").align(Align::Center),
            CellSpec::new("total").align(Align::Center),
            CellSpec::new("9"),
        ]);
        table.append(["a", "b", "c"]);
        let expected = "\
┌───────────────┬───┐
│     total     │ 9 │
│ a     │ b     │ c │
└───────┴───────┴───┘
";
        assert_eq!(text(&table), expected);
    }

    #[test]
    fn merged_cell_takes_column_alignment_without_override() {
        let mut table = Table::default();
        table.config_mut().row.merge.mode = MergeMode::Horizontal;
        table.append(["total", "total", "9"]);
        table.append(["a", "b", "c"]);
        assert!(text(&table).contains("│ total         │ 9 │"));
    }

    #[test]
    fn both_mode_merges_blocks_across_rows() {
        let mut table = Table::default();
        table.config_mut().row.merge.mode = MergeMode::Both;
        table.config_mut().separators.between_rows = true;
        table.append(["k", "v", "v"]);
        table.append(["k", "v", "v"]);
        table.append(["z", "w", "q"]);
        let expected = "\
┌───┬───────┐
│ k │ v     │
│   │       │
│   │       │
├───┼───┬───┤
│ z │ w │ q │
└───┴───┴───┘
";
        assert_eq!(text(&table), expected);
    }

    #[test]
    fn hierarchical_merge_groups_by_prefix() {
        let mut table = Table::default();
        table.config_mut().row.merge.mode = MergeMode::Hierarchical;
        table.config_mut().separators.between_rows = true;
        table.append_bulk([
            ["fruit", "apple", "red"],
            ["fruit", "pear", "red"],
            ["veg", "pear", "red"],
        ]);
        let expected = "\
┌───────┬───────┬─────┐
│ fruit │ apple │ red │
│       ├───────┼─────┤
│       │ pear  │ red │
├───────┼───────┼─────┤
│ veg   │ pear  │ red │
└───────┴───────┴─────┘
";
        assert_eq!(text(&table), expected);
    }

    #[test]
    fn footer_gets_its_own_separator() {
        let mut table = people();
        table.footer(["", "Total", "2"]);
        let out = text(&table);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[5], "├───────┼───────┼──────────┤");
        assert_eq!(lines[6], "│       │ Total │ 2        │");
    }

    #[test]
    fn global_width_wraps_cells() {
        let mut table = Table::default();
        table.config_mut().widths.total = Some(20);
        table.header(["item", "description"]);
        table.append(["pen", "writes smoothly on any paper"]);
        let records = table.records().unwrap();
        for record in &records {
            match record {
                LineRecord::Content(line) => {
                    let rendered = BorderStyle::LIGHT.content_text(line);
                    assert!(display_width(&rendered) <= 20, "{rendered}");
                    for cell in &line.cells {
                        assert_eq!(display_width(&cell.text), cell.width);
                    }
                }
                LineRecord::Separator(line) => {
                    assert!(display_width(&BorderStyle::LIGHT.separator_text(line)) <= 20);
                }
            }
        }
        let body: Vec<&ContentLine> = records
            .iter()
            .filter_map(|record| match record {
                LineRecord::Content(line) if line.section == Section::Row => Some(line),
                _ => None,
            })
            .collect();
        assert!(body.len() > 1);
    }

    #[test]
    fn truncating_rows_keep_single_line() {
        let mut table = Table::default();
        table.config_mut().row.wrap = WrapPolicy::Truncate;
        table.config_mut().widths.fixed = vec![Some(10)];
        table.append(["This is a very long description"]);
        let out = text(&table);
        assert!(out.contains("│ This is a… │"));
    }

    #[test]
    fn unwrapped_cells_keep_their_whitespace_in_width() {
        let mut table = Table::default();
        table.config_mut().row.wrap = WrapPolicy::None;
        table.append(["  x  ", "y"]).append(["abc", "z"]);
        let expected = "\
┌───────┬───┐
│   x   │ y │
│ abc   │ z │
└───────┴───┘
";
        assert_eq!(text(&table), expected);
    }

    #[test]
    fn zero_minimum_width_keeps_short_columns_visible() {
        let mut table = Table::default();
        table.config_mut().widths.min_column = 0;
        table.config_mut().widths.total = Some(12);
        table.append(["a".repeat(40), "b".to_string()]);
        let plan = table.width_plan().unwrap();
        assert_eq!(plan.widths, vec![4, 1]);
        let out = text(&table);
        assert!(out.contains("│ aaaa │ b │"), "{out}");
    }

    #[test]
    fn enabled_stream_renders_rows_one_at_a_time() {
        let mut table = Table::default();
        table.config_mut().row.merge.mode = MergeMode::Vertical;
        table.append(["a", "1"]).append(["a", "2"]);
        assert!(text(&table).contains("│   │ 2 │"));

        table.config_mut().stream.enabled = true;
        assert!(matches!(
            table.render_to_string(&mut TextRenderer::new(BorderStyle::LIGHT)),
            Err(TableError::UndeterminedWidths)
        ));

        table.config_mut().stream.widths = vec![1, 1];
        let expected = "\
┌───┬───┐
│ a │ 1 │
│ a │ 2 │
└───┴───┘
";
        assert_eq!(text(&table), expected);
    }

    #[test]
    fn hidden_columns_disappear() {
        let mut table = Table::default();
        table.config_mut().widths.auto_hide = true;
        table.header(["a", "", "c"]);
        table.append(["1", "", "3"]);
        let out = text(&table);
        assert!(out.starts_with("┌───┬───┐"));
        assert!(out.contains("│ 1 │ 3 │"));
    }

    #[test]
    fn wide_and_colored_content_stays_aligned() {
        let mut table = Table::default();
        table.append(["日本", "\x1b[31mred\x1b[0m"]);
        table.append(["x", "plain"]);
        let out = text(&table);
        let widths: Vec<usize> = out.lines().map(display_width).collect();
        assert!(widths.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn mismatched_alignment_list_is_rejected() {
        let mut table = people();
        table.config_mut().row.alignment.per_column = vec![Some(Align::Right)];
        assert!(matches!(
            table.records(),
            Err(TableError::ColumnCountMismatch { expected: 3, found: 1, .. })
        ));
    }

    #[test]
    fn empty_table_renders_nothing() {
        assert_eq!(text(&Table::default()), "");
    }

    #[test]
    fn markdown_output() {
        let out = people()
            .render_to_string(&mut MarkdownRenderer::with_alignments(vec![
                Align::Left,
                Align::Right,
            ]))
            .unwrap();
        let expected = "\
| NAME  | AGE |   CITY   |
|:------|----:|----------|
| Alice | 25  | New York |
| Bob   | 30  | Boston   |
";
        assert_eq!(out, expected);
    }

    #[test]
    fn markdown_without_header_still_has_alignment_row() {
        let mut table = Table::default();
        table.append(["Alice", "25"]).append(["Bob", "30"]);
        let out = table
            .render_to_string(&mut MarkdownRenderer::default())
            .unwrap();
        let expected = "\
|       |    |
|-------|----|
| Alice | 25 |
| Bob   | 30 |
";
        assert_eq!(out, expected);

        let mut table = people();
        table.config_mut().separators.header_line = false;
        let out = table
            .render_to_string(&mut MarkdownRenderer::with_alignments(vec![Align::Right]))
            .unwrap();
        let expected = "\
| NAME  | AGE |   CITY   |
|------:|-----|----------|
| Alice | 25  | New York |
| Bob   | 30  | Boston   |
";
        assert_eq!(out, expected);
    }

    #[test]
    fn html_output_uses_spans() {
        let mut table = Table::default();
        table.config_mut().row.merge.mode = MergeMode::Vertical;
        table.header(["group", "item"]);
        table.append(["a", "one"]);
        table.append(["a", "two <b>"]);
        let out = table.render_to_string(&mut HtmlRenderer::default()).unwrap();
        let expected = "\
<table>
  <thead>
    <tr>
      <th style=\"text-align:center\">GROUP</th>
      <th style=\"text-align:center\">ITEM</th>
    </tr>
  </thead>
  <tbody>
    <tr>
      <td rowspan=\"2\">a</td>
      <td>one</td>
    </tr>
    <tr>
      <td>two &lt;b&gt;</td>
    </tr>
  </tbody>
</table>
";
        assert_eq!(out, expected);
    }

    #[test]
    fn width_plan_reports_tight_budget() {
        let mut table = people();
        table.config_mut().widths.total = Some(10);
        let plan = table.width_plan().unwrap();
        assert_eq!(plan.widths, vec![5, 3, 8]);
        assert!(matches!(
            plan.advisory,
            Some(crate::resolve::Advisory::BudgetTooSmall { available: 10, .. })
        ));
    }

    #[test]
    fn colorized_output_wraps_sections_in_sgr() {
        let out = people()
            .render_to_string(&mut crate::render::ColorizedRenderer::default())
            .unwrap();
        let first_row = out.lines().nth(1).unwrap();
        assert!(first_row.contains("\x1b[96;1m NAME  \x1b[0m"));
        assert_eq!(crate::ansi::strip(&out), text(&people()));
    }

    #[test]
    fn private_cache_is_used() {
        let cache = Arc::new(WidthCache::new(8));
        let mut table = Table::default().with_cache(Arc::clone(&cache));
        table.append(["日本語"]);
        table.records().unwrap();
        assert_eq!(cache.get("日本語"), Some(6));
    }
}
