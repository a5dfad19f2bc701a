use std::io::{self, Write};

use crate::ansi;
use crate::assemble::{ContentCell, LineRecord, VerticalPosition};
use crate::config::{Align, Section};

use super::Renderer;

/// `<table>` markup with `colspan`/`rowspan` taken from span descriptors.
///
/// Physical lines of a row are collected and joined with `<br>`, so a row is
/// written once its last line arrives.
#[derive(Debug, Default)]
pub struct HtmlRenderer {
    group: Option<Section>,
    pending: Vec<PendingCell>,
}

#[derive(Debug)]
struct PendingCell {
    cols: usize,
    rows: usize,
    align: Align,
    visible: bool,
    lines: Vec<String>,
}

impl PendingCell {
    fn from_cell(cell: &ContentCell) -> Self {
        Self {
            cols: cell.cols,
            rows: cell.rows,
            align: cell.align,
            visible: matches!(cell.vertical, VerticalPosition::None | VerticalPosition::Top),
            lines: Vec::new(),
        }
    }
}

fn group_tag(section: Section) -> &'static str {
    match section {
        Section::Header => "thead",
        Section::Row => "tbody",
        Section::Footer => "tfoot",
    }
}

fn escape(text: &str) -> String {
    let plain = ansi::strip(text);
    let mut out = String::with_capacity(plain.len());
    for ch in plain.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

impl HtmlRenderer {
    fn switch_group(&mut self, section: Section, out: &mut dyn Write) -> io::Result<()> {
        if self.group == Some(section) {
            return Ok(());
        }
        if let Some(open) = self.group.take() {
            writeln!(out, "  </{}>", group_tag(open))?;
        }
        writeln!(out, "  <{}>", group_tag(section))?;
        self.group = Some(section);
        Ok(())
    }

    fn flush_row(&mut self, section: Section, out: &mut dyn Write) -> io::Result<()> {
        self.switch_group(section, out)?;
        let tag = if section == Section::Header { "th" } else { "td" };
        writeln!(out, "    <tr>")?;
        for cell in self.pending.drain(..) {
            if !cell.visible {
                continue;
            }
            let mut attrs = String::new();
            if cell.cols > 1 {
                attrs.push_str(&format!(" colspan=\"{}\"", cell.cols));
            }
            if cell.rows > 1 {
                attrs.push_str(&format!(" rowspan=\"{}\"", cell.rows));
            }
            match cell.align {
                Align::Center => attrs.push_str(" style=\"text-align:center\""),
                Align::Right => attrs.push_str(" style=\"text-align:right\""),
                Align::Left | Align::Skip => {}
            }
            let lines: Vec<String> = cell
                .lines
                .iter()
                .map(|line| escape(line.trim()))
                .collect();
            let first = lines.iter().position(|line| !line.is_empty());
            let last = lines.iter().rposition(|line| !line.is_empty());
            let body = match (first, last) {
                (Some(first), Some(last)) => lines[first..=last].join("<br>"),
                _ => String::new(),
            };
            writeln!(out, "      <{tag}{attrs}>{body}</{tag}>")?;
        }
        writeln!(out, "    </tr>")
    }
}

impl Renderer for HtmlRenderer {
    fn begin(&mut self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "<table>")
    }

    fn line(&mut self, record: &LineRecord, out: &mut dyn Write) -> io::Result<()> {
        let LineRecord::Content(line) = record else {
            return Ok(());
        };
        if line.line == 0 {
            self.pending = line.cells.iter().map(PendingCell::from_cell).collect();
        }
        for (pending, cell) in self.pending.iter_mut().zip(&line.cells) {
            pending.lines.push(cell.content.clone());
        }
        if line.line + 1 == line.height {
            self.flush_row(line.section, out)?;
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if let Some(open) = self.group.take() {
            writeln!(out, "  </{}>", group_tag(open))?;
        }
        writeln!(out, "</table>")
    }
}
