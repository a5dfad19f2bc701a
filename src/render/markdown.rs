use std::io::{self, Write};

use crate::assemble::{ContentLine, LineRecord, SeparatorKind};
use crate::config::{Align, Section};

use super::Renderer;

/// GitHub-flavoured markdown pipes.
///
/// Only the header separator is drawn; it becomes the alignment row. Merged
/// cells keep their text in the first column and leave the rest empty.
///
/// A pipe table is not a table without its alignment row, so one is still
/// written when no header separator arrives: under the header lines, or
/// under a blank header when the table has none.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    /// Column alignments for the alignment row; missing entries get plain
    /// dashes.
    pub alignments: Vec<Align>,
    delimited: bool,
    header_lines: bool,
    /// `(width, cols)` of each cell on the last content line.
    layout: Vec<(usize, usize)>,
}

impl MarkdownRenderer {
    pub fn with_alignments(alignments: Vec<Align>) -> Self {
        Self {
            alignments,
            ..Self::default()
        }
    }

    fn delimiter_row(&self, layout: &[(usize, usize)]) -> String {
        let mut text = String::from("|");
        let mut col = 0;
        for &(width, cols) in layout {
            text.push_str(&self.alignment_cell(col, width));
            text.push('|');
            for extra in 1..cols {
                text.push_str(&self.alignment_cell(col + extra, 3));
                text.push('|');
            }
            col += cols;
        }
        text
    }

    fn content_row(line: &ContentLine) -> String {
        let mut text = String::from("|");
        for cell in &line.cells {
            text.push_str(&cell.text.replace('|', "\\|"));
            text.push('|');
            for _ in 1..cell.cols {
                text.push('|');
            }
        }
        text
    }

    fn alignment_cell(&self, col: usize, width: usize) -> String {
        let width = width.max(3);
        match self.alignments.get(col) {
            Some(Align::Center) => format!(":{}:", "-".repeat(width - 2)),
            Some(Align::Right) => format!("{}:", "-".repeat(width - 1)),
            Some(Align::Left) => format!(":{}", "-".repeat(width - 1)),
            _ => "-".repeat(width),
        }
    }
}

impl Renderer for MarkdownRenderer {
    fn begin(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        self.delimited = false;
        self.header_lines = false;
        self.layout.clear();
        Ok(())
    }

    fn line(&mut self, record: &LineRecord, out: &mut dyn Write) -> io::Result<()> {
        match record {
            LineRecord::Separator(line) if line.kind == SeparatorKind::Header => {
                let mut text = String::from("|");
                for (col, segment) in line.segments.iter().enumerate() {
                    text.push_str(&self.alignment_cell(col, segment.width()));
                    text.push('|');
                }
                self.delimited = true;
                writeln!(out, "{text}")
            }
            LineRecord::Separator(_) => Ok(()),
            LineRecord::Content(line) => {
                let layout: Vec<(usize, usize)> =
                    line.cells.iter().map(|cell| (cell.width, cell.cols)).collect();
                if line.section == Section::Header {
                    self.header_lines = true;
                } else if !self.delimited {
                    if !self.header_lines {
                        let mut blank = String::from("|");
                        for &(width, cols) in &layout {
                            blank.push_str(&" ".repeat(width));
                            blank.push_str(&"|".repeat(cols));
                        }
                        writeln!(out, "{blank}")?;
                    }
                    writeln!(out, "{}", self.delimiter_row(&layout))?;
                    self.delimited = true;
                }
                self.layout = layout;
                writeln!(out, "{}", Self::content_row(line))
            }
        }
    }

    fn finish(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if self.header_lines && !self.delimited {
            writeln!(out, "{}", self.delimiter_row(&self.layout))?;
            self.delimited = true;
        }
        Ok(())
    }
}
