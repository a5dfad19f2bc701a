//! Table layout and merge engine.
//!
//! Cells go through width resolution, merge planning, wrapping and grid
//! assembly; the result is a list of [`LineRecord`]s that any [`Renderer`]
//! can paint. [`Table`] does this for a whole buffered table and
//! [`TableStream`] one row at a time against frozen widths.

pub mod ansi;
pub mod assemble;
pub mod cell;
pub mod config;
pub mod error;
pub mod markdown;
pub mod merge;
pub mod render;
pub mod resolve;
pub mod stream;
pub mod table;
pub mod width;
pub mod wrap;

pub use assemble::{
    ContentCell, ContentLine, Joint, LineRecord, Segment, SeparatorKind, SeparatorLine,
    VerticalPosition,
};
pub use cell::CellSpec;
pub use config::{
    Align, Borders, Padding, Section, SectionConfig, Separators, StreamConfig, Symbols,
    TableConfig, WidthConfig, WidthInference, WrapPolicy,
};
pub use error::TableError;
pub use markdown::{extract_tables, MarkdownTable};
pub use merge::{MergeMode, Span};
pub use render::{
    render_all, BorderStyle, ColorizedRenderer, Format, HtmlRenderer, MarkdownRenderer, Renderer,
    TextRenderer,
};
pub use resolve::{Advisory, WidthPlan};
pub use stream::{StreamState, TableStream};
pub use table::Table;
pub use width::{display_width, global_cache, WidthCache};
