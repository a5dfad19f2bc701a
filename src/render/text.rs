use std::io::{self, Write};

use crate::assemble::{ContentLine, Joint, LineRecord, Segment, SeparatorLine};

use super::Renderer;

/// Glyphs for the plain-text grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderStyle {
    pub horizontal: char,
    pub vertical: char,
    pub top_left: char,
    pub top_mid: char,
    pub top_right: char,
    pub mid_left: char,
    pub cross: char,
    pub mid_right: char,
    pub bottom_left: char,
    pub bottom_mid: char,
    pub bottom_right: char,
}

impl BorderStyle {
    pub const LIGHT: BorderStyle = BorderStyle {
        horizontal: '─',
        vertical: '│',
        top_left: '┌',
        top_mid: '┬',
        top_right: '┐',
        mid_left: '├',
        cross: '┼',
        mid_right: '┤',
        bottom_left: '└',
        bottom_mid: '┴',
        bottom_right: '┘',
    };

    pub const ROUNDED: BorderStyle = BorderStyle {
        top_left: '╭',
        top_right: '╮',
        bottom_left: '╰',
        bottom_right: '╯',
        ..BorderStyle::LIGHT
    };

    pub const HEAVY: BorderStyle = BorderStyle {
        horizontal: '━',
        vertical: '┃',
        top_left: '┏',
        top_mid: '┳',
        top_right: '┓',
        mid_left: '┣',
        cross: '╋',
        mid_right: '┫',
        bottom_left: '┗',
        bottom_mid: '┻',
        bottom_right: '┛',
    };

    pub const DOUBLE: BorderStyle = BorderStyle {
        horizontal: '═',
        vertical: '║',
        top_left: '╔',
        top_mid: '╦',
        top_right: '╗',
        mid_left: '╠',
        cross: '╬',
        mid_right: '╣',
        bottom_left: '╚',
        bottom_mid: '╩',
        bottom_right: '╝',
    };

    pub const ASCII: BorderStyle = BorderStyle {
        horizontal: '-',
        vertical: '|',
        top_left: '+',
        top_mid: '+',
        top_right: '+',
        mid_left: '+',
        cross: '+',
        mid_right: '+',
        bottom_left: '+',
        bottom_mid: '+',
        bottom_right: '+',
    };

    pub fn by_name(name: &str) -> Option<BorderStyle> {
        match name {
            "light" => Some(Self::LIGHT),
            "rounded" => Some(Self::ROUNDED),
            "heavy" => Some(Self::HEAVY),
            "double" => Some(Self::DOUBLE),
            "ascii" => Some(Self::ASCII),
            _ => None,
        }
    }

    /// Glyph for a junction with the given arms.
    pub fn joint(&self, joint: Joint) -> char {
        let Joint {
            up,
            down,
            left,
            right,
        } = joint;
        match (up, down, left, right) {
            (false, false, false, false) => ' ',
            (_, _, false, false) => self.vertical,
            (false, false, _, _) => self.horizontal,
            (false, true, false, true) => self.top_left,
            (false, true, true, false) => self.top_right,
            (true, false, false, true) => self.bottom_left,
            (true, false, true, false) => self.bottom_right,
            (true, true, false, true) => self.mid_left,
            (true, true, true, false) => self.mid_right,
            (false, true, true, true) => self.top_mid,
            (true, false, true, true) => self.bottom_mid,
            (true, true, true, true) => self.cross,
        }
    }

    pub fn separator_text(&self, line: &SeparatorLine) -> String {
        let mut out = String::new();
        for (pos, joint) in line.joints.iter().enumerate() {
            if let Some(joint) = joint {
                out.push(self.joint(*joint));
            }
            match line.segments.get(pos) {
                Some(Segment::Rule(width)) => {
                    out.extend(std::iter::repeat(self.horizontal).take(*width))
                }
                Some(Segment::Through(width)) => out.push_str(&" ".repeat(*width)),
                None => {}
            }
        }
        out
    }

    pub fn content_text(&self, line: &ContentLine) -> String {
        let mut out = String::new();
        if line.left {
            out.push(self.vertical);
        }
        for (idx, cell) in line.cells.iter().enumerate() {
            if idx > 0 && line.inner {
                out.push(self.vertical);
            }
            out.push_str(&cell.text);
        }
        if line.right {
            out.push(self.vertical);
        }
        out
    }
}

impl Default for BorderStyle {
    fn default() -> Self {
        Self::LIGHT
    }
}

/// Box-drawing (or ASCII) grid.
#[derive(Debug, Clone, Default)]
pub struct TextRenderer {
    style: BorderStyle,
}

impl TextRenderer {
    pub fn new(style: BorderStyle) -> Self {
        Self { style }
    }
}

impl Renderer for TextRenderer {
    fn line(&mut self, record: &LineRecord, out: &mut dyn Write) -> io::Result<()> {
        let text = match record {
            LineRecord::Separator(line) => self.style.separator_text(line),
            LineRecord::Content(line) => self.style.content_text(line),
        };
        writeln!(out, "{text}")
    }
}
