use std::io;

use crate::config::Section;

/// Errors reported while configuring, streaming or writing a table.
#[derive(thiserror::Error, Debug)]
pub enum TableError {
    /// Streaming needs widths before the first row arrives.
    #[error("streaming needs explicit column widths or a width inference policy")]
    UndeterminedWidths,
    /// A per-column setting does not line up with the table's columns.
    #[error("{section} {field} lists {found} columns but the table has {expected}")]
    ColumnCountMismatch {
        section: Section,
        field: &'static str,
        expected: usize,
        found: usize,
    },
    /// A streamed row is wider than the frozen width plan.
    #[error("row has {found} cells but the stream was sized for {expected} columns")]
    RowTooWide { expected: usize, found: usize },
    #[error("stream has not been started")]
    NotStarted,
    #[error("stream was already started")]
    AlreadyStarted,
    #[error("stream is closed")]
    Closed,
    /// A block arrived after one that must follow it.
    #[error("cannot emit {block} after {state}")]
    OutOfOrder {
        block: &'static str,
        state: &'static str,
    },
    #[error("failed to write table: {0}")]
    Io(#[from] io::Error),
}
