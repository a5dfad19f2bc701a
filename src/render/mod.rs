//! Backends that paint line records.
//!
//! A renderer never re-derives widths, wraps or merges; it only turns each
//! record into output. `begin`/`finish` bracket a table so that formats with
//! an envelope (HTML) can stream too.

mod color;
mod html;
mod markdown;
mod text;

use std::io::{self, Write};

pub use color::ColorizedRenderer;
pub use html::HtmlRenderer;
pub use markdown::MarkdownRenderer;
pub use text::{BorderStyle, TextRenderer};

use crate::assemble::LineRecord;

pub trait Renderer {
    fn begin(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }

    fn line(&mut self, record: &LineRecord, out: &mut dyn Write) -> io::Result<()>;

    fn finish(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn begin(&mut self, out: &mut dyn Write) -> io::Result<()> {
        (**self).begin(out)
    }

    fn line(&mut self, record: &LineRecord, out: &mut dyn Write) -> io::Result<()> {
        (**self).line(record, out)
    }

    fn finish(&mut self, out: &mut dyn Write) -> io::Result<()> {
        (**self).finish(out)
    }
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn begin(&mut self, out: &mut dyn Write) -> io::Result<()> {
        (**self).begin(out)
    }

    fn line(&mut self, record: &LineRecord, out: &mut dyn Write) -> io::Result<()> {
        (**self).line(record, out)
    }

    fn finish(&mut self, out: &mut dyn Write) -> io::Result<()> {
        (**self).finish(out)
    }
}

/// Paints a whole table.
pub fn render_all<R: Renderer + ?Sized>(
    renderer: &mut R,
    records: &[LineRecord],
    out: &mut dyn Write,
) -> io::Result<()> {
    renderer.begin(out)?;
    for record in records {
        renderer.line(record, out)?;
    }
    renderer.finish(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Ascii,
    Markdown,
    Html,
    Color,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "text" | "box" => Ok(Format::Text),
            "ascii" => Ok(Format::Ascii),
            "markdown" | "md" => Ok(Format::Markdown),
            "html" => Ok(Format::Html),
            "color" | "colour" | "ansi" => Ok(Format::Color),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

impl Format {
    pub fn renderer(self) -> Box<dyn Renderer> {
        match self {
            Format::Text => Box::new(TextRenderer::new(BorderStyle::LIGHT)),
            Format::Ascii => Box::new(TextRenderer::new(BorderStyle::ASCII)),
            Format::Markdown => Box::new(MarkdownRenderer::default()),
            Format::Html => Box::new(HtmlRenderer::default()),
            Format::Color => Box::new(ColorizedRenderer::default()),
        }
    }
}
