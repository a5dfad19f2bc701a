//! ANSI escape handling shared by measurement, wrapping and header formatting.
//!
//! Only the shapes that show up in colorized cell text are recognised: CSI
//! sequences (`ESC [ ... final`), OSC sequences terminated by BEL or `ESC \`,
//! and two-byte escapes. Anything else is treated as printable text.

use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

const ESC: char = '\x1b';
pub const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Escape(&'a str),
    Text(&'a str),
}

/// Splits `text` into escape sequences and printable runs.
pub fn tokens(text: &str) -> Tokens<'_> {
    Tokens { rest: text }
}

pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        if self.rest.starts_with(ESC) {
            let len = escape_len(self.rest);
            let (head, tail) = self.rest.split_at(len);
            self.rest = tail;
            return Some(Token::Escape(head));
        }
        let end = self.rest.find(ESC).unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(Token::Text(head))
    }
}

fn escape_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    match bytes.get(1) {
        Some(b'[') => {
            for (idx, byte) in bytes.iter().enumerate().skip(2) {
                if (0x40..=0x7e).contains(byte) {
                    return idx + 1;
                }
            }
            bytes.len()
        }
        Some(b']') => {
            let mut idx = 2;
            while idx < bytes.len() {
                match bytes[idx] {
                    0x07 => return idx + 1,
                    0x1b if bytes.get(idx + 1) == Some(&b'\\') => return idx + 2,
                    _ => idx += 1,
                }
            }
            bytes.len()
        }
        Some(_) => {
            // ESC followed by a single (possibly multi-byte) character.
            text[1..]
                .chars()
                .next()
                .map(|ch| 1 + ch.len_utf8())
                .unwrap_or(1)
        }
        None => 1,
    }
}

pub fn has_escapes(text: &str) -> bool {
    text.contains(ESC)
}

/// Removes every escape sequence, leaving only printable text.
pub fn strip(text: &str) -> Cow<'_, str> {
    if !has_escapes(text) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for token in tokens(text) {
        if let Token::Text(run) = token {
            out.push_str(run);
        }
    }
    Cow::Owned(out)
}

pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

/// Applies `f` to the printable runs of `text`, copying escapes through.
pub fn map_text(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    for token in tokens(text) {
        match token {
            Token::Escape(seq) => out.push_str(seq),
            Token::Text(run) => out.push_str(&f(run)),
        }
    }
    out
}

/// Splits `text` so that the head occupies at most `cols` display columns.
///
/// Escape sequences met before the cut stay with the head. Returns the head,
/// the remainder and the head's display width.
pub fn split_at_width(text: &str, cols: usize) -> (&str, &str, usize) {
    let mut used = 0usize;
    let mut offset = 0usize;
    for token in tokens(text) {
        match token {
            Token::Escape(seq) => offset += seq.len(),
            Token::Text(run) => {
                for (idx, ch) in run.char_indices() {
                    let w = char_width(ch);
                    if used + w > cols {
                        let cut = offset + idx;
                        return (&text[..cut], &text[cut..], used);
                    }
                    used += w;
                }
                offset += run.len();
            }
        }
    }
    (text, "", used)
}

fn is_sgr(seq: &str) -> bool {
    seq.starts_with("\x1b[") && seq.ends_with('m')
}

fn is_sgr_reset(seq: &str) -> bool {
    matches!(seq, "\x1b[0m" | "\x1b[m")
}

/// Tracks which SGR sequences are in effect after a run of text.
#[derive(Debug, Default, Clone)]
pub struct StyleState {
    active: Vec<String>,
}

impl StyleState {
    pub fn observe(&mut self, text: &str) {
        for token in tokens(text) {
            if let Token::Escape(seq) = token {
                if is_sgr_reset(seq) {
                    self.active.clear();
                } else if is_sgr(seq) {
                    self.active.push(seq.to_string());
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn prefix(&self) -> String {
        self.active.concat()
    }
}

/// Makes every line self-contained with respect to SGR styling: a style left
/// open at the end of a line is closed there and re-opened on the next one.
pub fn reflow_styles(lines: Vec<String>) -> Vec<String> {
    if !lines.iter().any(|line| has_escapes(line)) {
        return lines;
    }
    let mut state = StyleState::default();
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let mut rebuilt = state.prefix();
        state.observe(&line);
        rebuilt.push_str(&line);
        if state.is_active() && !line.is_empty() {
            rebuilt.push_str(RESET);
        }
        out.push(rebuilt);
    }
    out
}

/// Closes any style `text` leaves open.
pub fn close_open_style(mut text: String) -> String {
    let mut state = StyleState::default();
    state.observe(&text);
    if state.is_active() {
        text.push_str(RESET);
    }
    text
}
