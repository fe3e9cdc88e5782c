//! Fenced-line highlighting

use std::io::{self, Write};
use std::rc::Rc;

use crate::markup::{write_escaped, Element, MarkupStyle};
use crate::rules::{HighlightIndex, NodeId};

/// How lines inside the current fence are written
#[derive(Debug, Clone)]
pub enum FencedLineMode {
    /// Keywords and comment markers marked up with the language's rules
    Highlighted(Rc<HighlightIndex>),
    /// Escaped and wrapped, nothing highlighted
    PlainText,
    /// Copied unchanged for the documentation generator to handle
    Passthrough,
}

impl FencedLineMode {
    pub fn is_passthrough(&self) -> bool {
        matches!(self, FencedLineMode::Passthrough)
    }

    /// Write one fenced line
    ///
    /// `raw` is the input line as read, `stripped` the same line without
    /// the fence indentation.
    pub fn write_line<W: Write>(
        &self,
        out: &mut W,
        raw: &str,
        stripped: &str,
        style: MarkupStyle,
    ) -> io::Result<()> {
        match self {
            FencedLineMode::Highlighted(index) => highlight_line(out, index, stripped, style),
            FencedLineMode::PlainText => {
                out.write_all(style.line_open().as_bytes())?;
                write_escaped(out, stripped)?;
                out.write_all(style.line_close().as_bytes())?;
                out.write_all(b"\n")
            }
            FencedLineMode::Passthrough => {
                out.write_all(raw.as_bytes())?;
                out.write_all(b"\n")
            }
        }
    }
}

/// Write `line` wrapped in a line element with matched tags marked up
///
/// Words are matched whole. A comment marker marks up the rest of the line.
pub fn highlight_line<W: Write>(
    out: &mut W,
    index: &HighlightIndex,
    line: &str,
    style: MarkupStyle,
) -> io::Result<()> {
    out.write_all(style.line_open().as_bytes())?;

    let mut pos = 0;
    while pos < line.len() {
        let rest = &line[pos..];
        let byte = rest.as_bytes()[0];

        if index.is_name_char(byte) {
            match index.seek_word(rest) {
                Some(m) => {
                    write_tagged(out, index, m.node, &rest[..m.len])?;
                    pos += m.len;
                }
                None => {
                    let len = index.name_chars().word_len(rest);
                    write_escaped(out, &rest[..len])?;
                    pos += len;
                }
            }
        } else if let Some(m) = index.seek_comment(rest) {
            write_tagged(out, index, m.node, rest)?;
            break;
        } else {
            let len = rest.chars().next().map_or(1, char::len_utf8);
            write_escaped(out, &rest[..len])?;
            pos += len;
        }
    }

    out.write_all(style.line_close().as_bytes())?;
    out.write_all(b"\n")
}

/// Write `text` inside the element named by the category of `node`
///
/// A category without a value falls back to a span classed by its tag.
fn write_tagged<W: Write>(
    out: &mut W,
    index: &HighlightIndex,
    node: NodeId,
    text: &str,
) -> io::Result<()> {
    let element = match index.category(node) {
        Some(category) => match index.tree().value(category) {
            Some(value) => Element::parse(value),
            None => Element::span(index.tree().tag(category)),
        },
        None => return write_escaped(out, text),
    };

    element.write_open(out)?;
    write_escaped(out, text)?;
    element.write_close(out)
}
