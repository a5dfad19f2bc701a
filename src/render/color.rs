use std::io::{self, Write};

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::ansi::RESET;
use crate::assemble::{LineRecord, SeparatorLine};
use crate::config::Section;

use super::{BorderStyle, Renderer};

/// Box-drawing grid with per-section ratatui styles, written as ANSI SGR.
///
/// [`ColorizedRenderer::styled_line`] exposes the same output as ratatui
/// lines for embedding in a TUI.
#[derive(Debug, Clone)]
pub struct ColorizedRenderer {
    pub glyphs: BorderStyle,
    pub border: Style,
    pub header: Style,
    pub row: Style,
    pub footer: Style,
}

impl Default for ColorizedRenderer {
    fn default() -> Self {
        Self {
            glyphs: BorderStyle::LIGHT,
            border: Style::default().fg(Color::DarkGray),
            header: Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
            row: Style::default(),
            footer: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        }
    }
}

impl ColorizedRenderer {
    fn section_style(&self, section: Section) -> Style {
        match section {
            Section::Header => self.header,
            Section::Row => self.row,
            Section::Footer => self.footer,
        }
    }

    fn separator_line(&self, line: &SeparatorLine) -> Line<'static> {
        Line::from(Span::styled(self.glyphs.separator_text(line), self.border))
    }

    pub fn styled_line(&self, record: &LineRecord) -> Line<'static> {
        let line = match record {
            LineRecord::Separator(line) => return self.separator_line(line),
            LineRecord::Content(line) => line,
        };
        let bar = || Span::styled(self.glyphs.vertical.to_string(), self.border);
        let style = self.section_style(line.section);
        let mut spans = Vec::with_capacity(line.cells.len() * 2 + 1);
        if line.left {
            spans.push(bar());
        }
        for (idx, cell) in line.cells.iter().enumerate() {
            if idx > 0 && line.inner {
                spans.push(bar());
            }
            spans.push(Span::styled(cell.text.clone(), style));
        }
        if line.right {
            spans.push(bar());
        }
        Line::from(spans)
    }
}

impl Renderer for ColorizedRenderer {
    fn line(&mut self, record: &LineRecord, out: &mut dyn Write) -> io::Result<()> {
        let line = self.styled_line(record);
        write_segments(
            out,
            line.spans
                .iter()
                .map(|span| (span.style, span.content.as_ref())),
        )?;
        writeln!(out)
    }
}

fn write_segments<'a, I>(out: &mut dyn Write, segments: I) -> io::Result<()>
where
    I: IntoIterator<Item = (Style, &'a str)>,
{
    for (style, text) in segments {
        match sgr(style) {
            prefix if prefix.is_empty() => write!(out, "{text}")?,
            prefix => write!(out, "{prefix}{text}{RESET}")?,
        }
    }
    Ok(())
}

const MODIFIER_CODES: [(Modifier, u8); 6] = [
    (Modifier::BOLD, 1),
    (Modifier::DIM, 2),
    (Modifier::ITALIC, 3),
    (Modifier::UNDERLINED, 4),
    (Modifier::REVERSED, 7),
    (Modifier::CROSSED_OUT, 9),
];

/// Opening SGR sequence for `style`, empty when it sets nothing.
fn sgr(style: Style) -> String {
    let colors = [(style.fg, 0), (style.bg, 10)]
        .into_iter()
        .filter_map(|(color, offset)| color.map(|color| color_params(color, offset)));
    let modifiers = MODIFIER_CODES
        .iter()
        .filter(|(modifier, _)| style.add_modifier.contains(*modifier))
        .map(|(_, code)| code.to_string());
    let params: Vec<String> = colors.chain(modifiers).collect();
    if params.is_empty() {
        String::new()
    } else {
        format!("\x1b[{}m", params.join(";"))
    }
}

/// `offset` is 0 for the foreground and 10 for the background.
fn color_params(color: Color, offset: u8) -> String {
    let code = match color {
        Color::Reset => 39,
        Color::Black => 30,
        Color::Red => 31,
        Color::Green => 32,
        Color::Yellow => 33,
        Color::Blue => 34,
        Color::Magenta => 35,
        Color::Cyan => 36,
        Color::Gray => 37,
        Color::DarkGray => 90,
        Color::LightRed => 91,
        Color::LightGreen => 92,
        Color::LightYellow => 93,
        Color::LightBlue => 94,
        Color::LightMagenta => 95,
        Color::LightCyan => 96,
        Color::White => 97,
        Color::Indexed(idx) => return format!("{};5;{idx}", 38 + offset),
        Color::Rgb(r, g, b) => return format!("{};2;{r};{g};{b}", 38 + offset),
    };
    (code + offset).to_string()
}
