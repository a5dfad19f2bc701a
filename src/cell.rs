use crate::ansi;
use crate::config::{Align, Padding, Section, SectionConfig};
use crate::merge::MergeInput;
use crate::width::WidthCache;
use crate::wrap::Wrapper;

/// Caller-facing cell value with optional per-cell overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellSpec {
    pub text: String,
    pub align: Option<Align>,
    pub padding: Option<Padding>,
}

impl CellSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }
}

impl From<&str> for CellSpec {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for CellSpec {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&String> for CellSpec {
    fn from(text: &String) -> Self {
        Self::new(text.as_str())
    }
}

/// Header-style formatting: `_` and `.` become spaces, letters go upper case.
/// Escape sequences pass through untouched.
pub fn format_header(text: &str) -> String {
    ansi::map_text(text, |run| {
        run.chars()
            .map(|ch| if ch == '_' || ch == '.' { ' ' } else { ch })
            .collect::<String>()
            .to_uppercase()
    })
}

/// Alignment precedence: cell, then column, then section, then the section
/// default (headers center, everything else left).
pub fn resolve_align(
    section: Section,
    config: &SectionConfig,
    col: usize,
    explicit: Option<Align>,
) -> Align {
    explicit
        .or_else(|| config.alignment.per_column.get(col).copied().flatten())
        .or(config.alignment.global)
        .unwrap_or(match section {
            Section::Header => Align::Center,
            Section::Row | Section::Footer => Align::Left,
        })
}

/// A cell whose formatting decisions are made but which is not wrapped yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub raw: String,
    pub content: String,
    pub align: Align,
    pub padding: Padding,
}

impl Prepared {
    pub fn merge_input(&self) -> MergeInput {
        MergeInput {
            content: self.content.clone(),
            mergeable: self.align != Align::Skip,
        }
    }
}

/// Resolves formatting for one row, padding it out to `columns` cells.
pub fn prepare_row(
    section: Section,
    config: &SectionConfig,
    specs: &[CellSpec],
    columns: usize,
) -> Vec<Prepared> {
    (0..columns)
        .map(|col| {
            let spec = specs.get(col);
            let raw = spec.map(|spec| spec.text.clone()).unwrap_or_default();
            let content = if config.auto_format {
                format_header(&raw)
            } else {
                raw.clone()
            };
            Prepared {
                raw,
                content,
                align: resolve_align(section, config, col, spec.and_then(|spec| spec.align)),
                padding: spec
                    .and_then(|spec| spec.padding.clone())
                    .unwrap_or_else(|| config.padding.for_column(col).clone()),
            }
        })
        .collect()
}

/// A wrapped cell. Cells covered by another cell's span keep no lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub raw: String,
    pub content: String,
    pub align: Align,
    pub padding: Padding,
    pub lines: Vec<String>,
}

impl Cell {
    pub fn wrapped(prepared: Prepared, width: usize, wrapper: &Wrapper<'_>, cache: &WidthCache) -> Self {
        let lines = wrapper.wrap(&prepared.content, width, cache);
        Self::with_lines(prepared, lines)
    }

    pub fn filler(prepared: Prepared) -> Self {
        Self::with_lines(prepared, Vec::new())
    }

    fn with_lines(prepared: Prepared, lines: Vec<String>) -> Self {
        Self {
            raw: prepared.raw,
            content: prepared.content,
            align: prepared.align,
            padding: prepared.padding,
            lines,
        }
    }

    /// Physical lines including vertical padding.
    pub fn height(&self) -> usize {
        self.lines.len()
            + usize::from(!self.padding.top.is_empty())
            + usize::from(!self.padding.bottom.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPosition {
    First,
    Middle,
    Last,
    Only,
}

impl RowPosition {
    pub fn of(index: usize, count: usize) -> Self {
        match (index, count) {
            (_, 1) => RowPosition::Only,
            (0, _) => RowPosition::First,
            (idx, count) if idx + 1 == count => RowPosition::Last,
            _ => RowPosition::Middle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub section: Section,
    pub position: RowPosition,
    pub cells: Vec<Cell>,
}

impl Row {
    /// Tallest cell, never less than one line.
    pub fn height(&self) -> usize {
        self.cells.iter().map(Cell::height).max().unwrap_or(0).max(1)
    }
}
