//! GFM tables pulled out of a markdown document.

use std::mem;

use pulldown_cmark::{Alignment, CowStr, Event as MdEvent, Options, Parser, Tag};

use crate::cell::CellSpec;
use crate::config::{Align, TableConfig};
use crate::table::Table;

/// One table as written in the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownTable {
    /// Alignment from the delimiter row; `None` where the column has none.
    pub alignments: Vec<Option<Align>>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    pub fn columns(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain([self.header.len(), self.alignments.len()])
            .max()
            .unwrap_or(0)
    }

    /// Delimiter-row alignments padded out to the column count, for the
    /// markdown renderer.
    pub fn render_alignments(&self) -> Vec<Align> {
        (0..self.columns())
            .map(|col| self.alignments.get(col).copied().flatten().unwrap_or(Align::Skip))
            .collect()
    }

    /// Builds a [`Table`]. Source alignments become per-column body
    /// alignments unless `config` already sets its own.
    pub fn to_table(&self, mut config: TableConfig) -> Table {
        let columns = self.columns();
        if config.row.alignment.per_column.is_empty()
            && self.alignments.iter().any(Option::is_some)
        {
            config.row.alignment.per_column = (0..columns)
                .map(|col| self.alignments.get(col).copied().flatten())
                .collect();
        }
        let mut table = Table::new(config);
        if !self.header.is_empty() {
            table.header(self.header.iter().map(CellSpec::from));
        }
        for row in &self.rows {
            table.append(row.iter().map(CellSpec::from));
        }
        table
    }
}

fn map_alignment(alignment: Alignment) -> Option<Align> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some(Align::Left),
        Alignment::Center => Some(Align::Center),
        Alignment::Right => Some(Align::Right),
    }
}

/// Every table in `markdown`, in document order.
pub fn extract_tables(markdown: &str) -> Vec<MarkdownTable> {
    let parser = Parser::new_ext(
        markdown,
        Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES,
    );
    let mut tables = Vec::new();
    let mut builder: Option<TableBuilder> = None;
    for event in parser {
        match event {
            MdEvent::Start(Tag::Table(alignments)) => {
                builder = Some(TableBuilder::new(alignments));
            }
            MdEvent::End(Tag::Table(_)) => {
                if let Some(table) = builder.take() {
                    tables.push(table.finish());
                }
            }
            event => {
                if let Some(table) = builder.as_mut() {
                    table.handle_event(event);
                }
            }
        }
    }
    tables
}

struct TableBuilder {
    alignments: Vec<Alignment>,
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
    current_row: Vec<String>,
    current_cell: String,
    in_head: bool,
    in_cell: bool,
}

impl TableBuilder {
    fn new(alignments: Vec<Alignment>) -> Self {
        Self {
            alignments,
            header: None,
            rows: Vec::new(),
            current_row: Vec::new(),
            current_cell: String::new(),
            in_head: false,
            in_cell: false,
        }
    }

    fn handle_event(&mut self, event: MdEvent<'_>) {
        match event {
            MdEvent::Start(Tag::TableHead) => self.start_head(),
            MdEvent::End(Tag::TableHead) => self.end_head(),
            MdEvent::Start(Tag::TableRow) => self.current_row.clear(),
            MdEvent::End(Tag::TableRow) => self.end_row(),
            MdEvent::Start(Tag::TableCell) => self.start_cell(),
            MdEvent::End(Tag::TableCell) => self.end_cell(),
            MdEvent::Text(text) => self.push_text(&text),
            MdEvent::Code(code) => self.push_code(&code),
            MdEvent::Html(html) => self.push_html(&html),
            MdEvent::SoftBreak => self.push_soft_break(),
            MdEvent::HardBreak => self.push_hard_break(),
            _ => {}
        }
    }

    fn start_head(&mut self) {
        if self.in_cell {
            self.end_cell();
        }
        self.current_row.clear();
        self.in_head = true;
    }

    fn end_head(&mut self) {
        if self.in_cell {
            self.end_cell();
        }
        if self.in_head && !self.current_row.is_empty() && self.header.is_none() {
            self.header = Some(mem::take(&mut self.current_row));
        }
        self.current_row.clear();
        self.in_head = false;
    }

    fn end_row(&mut self) {
        if self.in_cell {
            self.end_cell();
        }
        if !self.current_row.is_empty() {
            self.rows.push(mem::take(&mut self.current_row));
        }
    }

    fn start_cell(&mut self) {
        if self.in_cell {
            self.end_cell();
        }
        self.current_cell.clear();
        self.in_cell = true;
    }

    fn end_cell(&mut self) {
        if !self.in_cell {
            return;
        }
        let raw = mem::take(&mut self.current_cell);
        self.current_row.push(cell_text(&raw));
        self.in_cell = false;
    }

    fn push_text(&mut self, text: &CowStr<'_>) {
        if self.in_cell {
            self.current_cell.push_str(text.as_ref());
        }
    }

    fn push_code(&mut self, text: &CowStr<'_>) {
        if self.in_cell {
            self.current_cell.push('`');
            self.current_cell.push_str(text.as_ref());
            self.current_cell.push('`');
        }
    }

    fn push_soft_break(&mut self) {
        if self.in_cell && !self.current_cell.ends_with(' ') {
            self.current_cell.push(' ');
        }
    }

    fn push_hard_break(&mut self) {
        if self.in_cell {
            self.current_cell.push('\n');
        }
    }

    fn push_html(&mut self, html: &CowStr<'_>) {
        if !self.in_cell {
            return;
        }
        if is_html_break(html.as_ref()) {
            self.current_cell.push('\n');
        } else {
            self.current_cell.push_str(html.as_ref());
        }
    }

    fn finish(mut self) -> MarkdownTable {
        if self.in_cell {
            self.end_cell();
        }
        if !self.current_row.is_empty() {
            self.end_row();
        }
        MarkdownTable {
            alignments: self.alignments.into_iter().map(map_alignment).collect(),
            header: self.header.unwrap_or_default(),
            rows: self.rows,
        }
    }
}

/// Trims the cell and each of its `<br>`-separated lines.
fn cell_text(raw: &str) -> String {
    raw.trim()
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_html_break(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    matches!(lowered.as_str(), "<br>" | "<br/>" | "<br />")
}
