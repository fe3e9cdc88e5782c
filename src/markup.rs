//! Output markup
//!
//! Entity escaping for literal text, `element.class` rule values, and the
//! wrappers placed around fenced fragments and their lines.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Entity for a character that must not appear literally in the output
#[inline]
pub fn entity(ch: char) -> Option<&'static str> {
    match ch {
        '@' => Some("&commat;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&apos;"),
        _ => None,
    }
}

/// Write `text` with reserved characters replaced by entities
pub fn write_escaped<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        if let Some(entity) = entity(ch) {
            out.write_all(text[start..i].as_bytes())?;
            out.write_all(entity.as_bytes())?;
            start = i + ch.len_utf8();
        }
    }
    out.write_all(text[start..].as_bytes())
}

/// Escaped copy of `text`
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match entity(ch) {
            Some(entity) => out.push_str(entity),
            None => out.push(ch),
        }
    }
    out
}

/// Element parsed from a rule category value such as `span.keywordflow`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    pub name: &'a str,
    pub class: Option<&'a str>,
}

impl<'a> Element<'a> {
    /// Split at the first `.` into element name and class
    pub fn parse(value: &'a str) -> Self {
        match value.split_once('.') {
            Some((name, class)) => Self {
                name,
                class: Some(class),
            },
            None => Self {
                name: value,
                class: None,
            },
        }
    }

    /// A `span` carrying `class`
    pub fn span(class: &'a str) -> Self {
        Self {
            name: "span",
            class: Some(class),
        }
    }

    pub fn write_open<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.class {
            Some(class) => write!(out, "<{} class=\"{}\">", self.name, class),
            None => write!(out, "<{}>", self.name),
        }
    }

    pub fn write_close<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "</{}>", self.name)
    }
}

/// Wrapper markup for highlighted fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MarkupStyle {
    /// `<div class="fragment">` inside `@htmlonly`/`@endhtmlonly`
    #[default]
    Doxygen,
    /// Bare `<div class="fragment">`
    Html,
    /// `<pre><code>` with unwrapped lines
    Pre,
}

impl MarkupStyle {
    pub fn fragment_open(self) -> &'static str {
        match self {
            MarkupStyle::Doxygen => "  @htmlonly <div class=\"fragment\">",
            MarkupStyle::Html => "<div class=\"fragment\">",
            MarkupStyle::Pre => "<pre><code>",
        }
    }

    pub fn fragment_close(self) -> &'static str {
        match self {
            MarkupStyle::Doxygen => "  </div> @endhtmlonly",
            MarkupStyle::Html => "</div>",
            MarkupStyle::Pre => "</code></pre>",
        }
    }

    pub fn line_open(self) -> &'static str {
        match self {
            MarkupStyle::Doxygen => "  <div class=\"line\">",
            MarkupStyle::Html => "<div class=\"line\">",
            MarkupStyle::Pre => "",
        }
    }

    pub fn line_close(self) -> &'static str {
        match self {
            MarkupStyle::Doxygen | MarkupStyle::Html => "</div>",
            MarkupStyle::Pre => "",
        }
    }
}
