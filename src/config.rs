use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TableError;
use crate::merge::MergeMode;

/// Which block of the table a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Header,
    Row,
    Footer,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Section::Header => "header",
            Section::Row => "row",
            Section::Footer => "footer",
        })
    }
}

/// Horizontal alignment of cell text.
///
/// `Skip` leaves text where it starts (left) and opts the cell out of merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapPolicy {
    /// Emit content verbatim on one line; the renderer may overflow.
    None,
    /// Greedy word wrap, hard-splitting words longer than the width.
    #[default]
    Normal,
    /// Like `Normal`, marking mid-word splits with the break glyph.
    Break,
    /// One line, cut with an ellipsis.
    Truncate,
}

/// Padding glyphs around cell content. Empty strings mean no padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub left: String,
    pub right: String,
    pub top: String,
    pub bottom: String,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            left: " ".into(),
            right: " ".into(),
            top: String::new(),
            bottom: String::new(),
        }
    }
}

impl Padding {
    pub fn none() -> Self {
        Self {
            left: String::new(),
            right: String::new(),
            top: String::new(),
            bottom: String::new(),
        }
    }

    pub fn horizontal(&self) -> usize {
        crate::width::display_width(&self.left) + crate::width::display_width(&self.right)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    pub global: Option<Align>,
    pub per_column: Vec<Option<Align>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddingConfig {
    pub global: Padding,
    pub per_column: Vec<Option<Padding>>,
}

impl PaddingConfig {
    pub fn for_column(&self, col: usize) -> &Padding {
        self.per_column
            .get(col)
            .and_then(Option::as_ref)
            .unwrap_or(&self.global)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub mode: MergeMode,
    /// When non-empty, only these columns may merge.
    pub columns: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub alignment: AlignConfig,
    pub padding: PaddingConfig,
    pub wrap: WrapPolicy,
    pub merge: MergeConfig,
    pub auto_format: bool,
}

impl SectionConfig {
    pub fn header() -> Self {
        Self {
            auto_format: true,
            ..Self::default()
        }
    }

    /// Checks per-column lists against the table's column count.
    pub fn validate(&self, section: Section, columns: usize) -> Result<(), TableError> {
        check_len(section, "alignment", self.alignment.per_column.len(), columns)?;
        check_len(section, "padding", self.padding.per_column.len(), columns)
    }
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            alignment: AlignConfig::default(),
            padding: PaddingConfig::default(),
            wrap: WrapPolicy::Normal,
            merge: MergeConfig::default(),
            auto_format: false,
        }
    }
}

/// Header fields missing from a config file fall back to [`SectionConfig::header`],
/// not to the plain section default.
#[derive(Deserialize)]
#[serde(default)]
struct HeaderSection {
    alignment: AlignConfig,
    padding: PaddingConfig,
    wrap: WrapPolicy,
    merge: MergeConfig,
    auto_format: bool,
}

impl Default for HeaderSection {
    fn default() -> Self {
        let SectionConfig {
            alignment,
            padding,
            wrap,
            merge,
            auto_format,
        } = SectionConfig::header();
        Self {
            alignment,
            padding,
            wrap,
            merge,
            auto_format,
        }
    }
}

fn header_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SectionConfig, D::Error> {
    let header = HeaderSection::deserialize(deserializer)?;
    Ok(SectionConfig {
        alignment: header.alignment,
        padding: header.padding,
        wrap: header.wrap,
        merge: header.merge,
        auto_format: header.auto_format,
    })
}

fn check_len(
    section: Section,
    field: &'static str,
    found: usize,
    expected: usize,
) -> Result<(), TableError> {
    if found == 0 || found == expected {
        Ok(())
    } else {
        Err(TableError::ColumnCountMismatch {
            section,
            field,
            expected,
            found,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidthConfig {
    /// Explicit content width per column; wins over everything else.
    pub fixed: Vec<Option<usize>>,
    /// Cap on a column's natural width.
    pub max: Vec<Option<usize>>,
    /// Budget for the whole rendered table, borders and padding included.
    pub total: Option<usize>,
    pub min_column: usize,
    /// Drop columns whose every cell is empty.
    pub auto_hide: bool,
}

impl Default for WidthConfig {
    fn default() -> Self {
        Self {
            fixed: Vec::new(),
            max: Vec::new(),
            total: None,
            min_column: 1,
            auto_hide: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Borders {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Default for Borders {
    fn default() -> Self {
        Self {
            top: true,
            bottom: true,
            left: true,
            right: true,
        }
    }
}

impl Borders {
    pub fn none() -> Self {
        Self {
            top: false,
            bottom: false,
            left: false,
            right: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Separators {
    pub header_line: bool,
    pub footer_line: bool,
    pub between_rows: bool,
    pub between_columns: bool,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            header_line: true,
            footer_line: true,
            between_rows: false,
            between_columns: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthInference {
    #[default]
    None,
    /// Freeze widths from the first block that arrives.
    FirstRow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub enabled: bool,
    pub widths: Vec<usize>,
    pub inference: WidthInference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Symbols {
    pub ellipsis: String,
    pub break_mark: String,
}

impl Default for Symbols {
    fn default() -> Self {
        Self {
            ellipsis: "…".into(),
            break_mark: "↩".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    #[serde(deserialize_with = "header_section")]
    pub header: SectionConfig,
    pub row: SectionConfig,
    pub footer: SectionConfig,
    pub widths: WidthConfig,
    pub borders: Borders,
    pub separators: Separators,
    pub stream: StreamConfig,
    pub symbols: Symbols,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            header: SectionConfig::header(),
            row: SectionConfig::default(),
            footer: SectionConfig::default(),
            widths: WidthConfig::default(),
            borders: Borders::default(),
            separators: Separators::default(),
            stream: StreamConfig::default(),
            symbols: Symbols::default(),
        }
    }
}

impl TableConfig {
    pub fn section(&self, section: Section) -> &SectionConfig {
        match section {
            Section::Header => &self.header,
            Section::Row => &self.row,
            Section::Footer => &self.footer,
        }
    }

    pub fn validate(&self, columns: usize) -> Result<(), TableError> {
        self.header.validate(Section::Header, columns)?;
        self.row.validate(Section::Row, columns)?;
        self.footer.validate(Section::Footer, columns)
    }

    /// Widest left+right padding any section uses for `col`.
    pub fn max_padding(&self, col: usize) -> usize {
        [&self.header, &self.row, &self.footer]
            .iter()
            .map(|section| section.padding.for_column(col).horizontal())
            .max()
            .unwrap_or(0)
    }
}
