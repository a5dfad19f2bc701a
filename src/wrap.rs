//! Cell text wrapping.
//!
//! Every policy splits on embedded newlines first and handles each segment
//! on its own. Widths are display columns; escape sequences are kept and
//! re-balanced so each physical line carries its own styling.

use textwrap::{wrap as textwrap_wrap, Options as WrapOptions, WordSeparator, WordSplitter};

use crate::ansi;
use crate::config::{Symbols, WrapPolicy};
use crate::width::{global_cache, WidthCache};

/// Wraps `text` to `width` with the default ellipsis and break mark.
pub fn wrap(text: &str, width: usize, policy: WrapPolicy) -> Vec<String> {
    let symbols = Symbols::default();
    Wrapper::new(policy, &symbols).wrap(text, width, &global_cache())
}

#[derive(Debug, Clone, Copy)]
pub struct Wrapper<'a> {
    pub policy: WrapPolicy,
    pub ellipsis: &'a str,
    pub break_mark: &'a str,
}

impl<'a> Wrapper<'a> {
    pub fn new(policy: WrapPolicy, symbols: &'a Symbols) -> Self {
        Self {
            policy,
            ellipsis: &symbols.ellipsis,
            break_mark: &symbols.break_mark,
        }
    }

    /// Produces at least one line; all lines fit `width` except under
    /// `WrapPolicy::None`.
    pub fn wrap(&self, text: &str, width: usize, cache: &WidthCache) -> Vec<String> {
        let mut lines = Vec::new();
        for segment in segments(text) {
            match self.policy {
                WrapPolicy::None => lines.push(segment.to_string()),
                WrapPolicy::Normal => lines.extend(wrap_normal(segment.trim(), width)),
                WrapPolicy::Break => lines.extend(self.wrap_break(segment.trim(), width, cache)),
                WrapPolicy::Truncate => lines.push(self.truncate(segment.trim(), width, cache)),
            }
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        if self.policy == WrapPolicy::None {
            lines
        } else {
            ansi::reflow_styles(lines)
        }
    }

    fn wrap_break(&self, text: &str, width: usize, cache: &WidthCache) -> Vec<String> {
        if width == 0 || text.is_empty() {
            return vec![String::new()];
        }
        let mark_width = cache.measure(self.break_mark);
        let mut lines = Vec::new();
        let mut line = String::new();
        let mut used = 0usize;
        for word in text.split_whitespace() {
            let word_width = cache.measure(word);
            let gap = usize::from(!line.is_empty());
            if used + gap + word_width <= width {
                if gap == 1 {
                    line.push(' ');
                }
                line.push_str(word);
                used += gap + word_width;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                used = 0;
            }
            let mut rest = word;
            loop {
                let rest_width = cache.measure(rest);
                if rest_width <= width {
                    line.push_str(rest);
                    used = rest_width;
                    break;
                }
                let marked = width > mark_width;
                let room = if marked { width - mark_width } else { width };
                let (head, tail) = split_with_progress(rest, room);
                let mut chunk = head.to_string();
                if marked {
                    chunk.push_str(self.break_mark);
                }
                lines.push(chunk);
                rest = tail;
            }
        }
        if !line.is_empty() || lines.is_empty() {
            lines.push(line);
        }
        lines
    }

    fn truncate(&self, text: &str, width: usize, cache: &WidthCache) -> String {
        if cache.measure(text) <= width {
            return text.to_string();
        }
        let ellipsis_width = cache.measure(self.ellipsis);
        if width < ellipsis_width {
            return String::new();
        }
        let (head, _, _) = ansi::split_at_width(text, width - ellipsis_width);
        ansi::close_open_style(format!("{head}{}", self.ellipsis))
    }
}

/// The text `policy` lays out before any line is broken: every policy but
/// `None` drops the whitespace around each newline-separated segment.
pub fn unwrapped(text: &str, policy: WrapPolicy) -> String {
    segments(text)
        .map(|segment| match policy {
            WrapPolicy::None => segment,
            _ => segment.trim(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn segments(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|segment| segment.strip_suffix('\r').unwrap_or(segment))
}

fn wrap_normal(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.is_empty() {
        return vec![String::new()];
    }
    let options = WrapOptions::new(width)
        .break_words(true)
        .word_separator(WordSeparator::AsciiSpace)
        .word_splitter(WordSplitter::NoHyphenation);
    textwrap_wrap(text, options)
        .into_iter()
        .map(|segment| segment.into_owned())
        .collect()
}

/// Like `split_at_width`, but always moves at least one glyph into the head
/// so a glyph wider than `cols` cannot stall the caller.
fn split_with_progress(text: &str, cols: usize) -> (&str, &str) {
    let (head, tail, used) = ansi::split_at_width(text, cols);
    if used > 0 || tail.is_empty() {
        return (head, tail);
    }
    let step = tail.chars().next().map(char::len_utf8).unwrap_or(0);
    text.split_at(head.len() + step)
}
