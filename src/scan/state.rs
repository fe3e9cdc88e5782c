//! Scanner states and fence bookkeeping

use super::highlight::FencedLineMode;

/// Longest language identifier kept from an info string
pub const MAX_LANGUAGE_LEN: usize = 31;

/// Minimum run of fence characters that opens a fence
pub const MIN_FENCE_LEN: usize = 3;

/// State to return to once a fenced block closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Code,
    DocBlockComment,
}

/// What the scanner is inside of at the start of the next line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Code,
    /// A `//` comment continued with a trailing backslash
    LineComment,
    BlockComment,
    /// A comment opened with `/**` or `/*!`
    DocBlockComment,
    Fenced {
        resume: Resume,
    },
}

impl From<Resume> for ScanState {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::Code => ScanState::Code,
            Resume::DocBlockComment => ScanState::DocBlockComment,
        }
    }
}

/// A run of fence characters found at the start of some text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceOpener {
    pub fence_char: u8,
    pub count: usize,
}

#[inline]
pub fn is_fence_char(byte: u8) -> bool {
    byte == b'`' || byte == b'~'
}

/// Recognize three or more backticks or tildes at the start of `text`
pub fn fence_opener(text: &str) -> Option<FenceOpener> {
    let bytes = text.as_bytes();
    let fence_char = *bytes.first()?;
    if !is_fence_char(fence_char) {
        return None;
    }

    let count = bytes.iter().take_while(|b| **b == fence_char).count();
    (count >= MIN_FENCE_LEN).then_some(FenceOpener { fence_char, count })
}

/// Language identifier declared by a fence info string
///
/// Accepts `sql`, `.sql`, `{sql}` and `{.sql}`. An info string that is
/// empty or starts with whitespace declares nothing.
pub fn parse_info_string(info: &str) -> Option<String> {
    if info.is_empty() || info.starts_with(char::is_whitespace) {
        return None;
    }

    let info = info.strip_prefix('{').unwrap_or(info);
    let info = info.strip_prefix('.').unwrap_or(info);
    let end = info
        .find(|c: char| c == '}' || c.is_whitespace())
        .unwrap_or(info.len());
    let language = &info[..end];

    let kept: String = language.chars().take(MAX_LANGUAGE_LEN).collect();
    if kept.len() < language.len() {
        tracing::debug!("Truncated fence language '{}' to '{}'", language, kept);
    }

    (!kept.is_empty()).then_some(kept)
}

/// The fence currently open
#[derive(Debug)]
pub struct FenceContext {
    pub fence_char: u8,
    /// Number of fence characters a closer must repeat exactly
    pub count: usize,
    /// Column of the opener; stripped from every fenced line
    pub indent: usize,
    pub language: Option<String>,
    pub mode: FencedLineMode,
    /// Input line number of the opener
    pub opened_at: usize,
}

impl FenceContext {
    /// `line` without the opener's indentation; empty when shorter than that
    pub fn strip_indent<'a>(&self, line: &'a str) -> &'a str {
        if line.len() <= self.indent {
            return "";
        }
        let cut = (self.indent..=line.len())
            .find(|i| line.is_char_boundary(*i))
            .unwrap_or(line.len());
        &line[cut..]
    }

    /// Offset in `stripped` just past a closing run of fence characters
    ///
    /// The closer repeats the fence character exactly `count` times, after
    /// optional leading whitespace. A longer run is fenced content. Text
    /// after the run, such as the `*/` ending a doc comment, is left to
    /// the caller.
    pub fn closer_end(&self, stripped: &str) -> Option<usize> {
        let text = stripped.trim_start();
        let run = text
            .bytes()
            .take_while(|b| *b == self.fence_char)
            .count();

        (run == self.count).then(|| stripped.len() - text.len() + run)
    }

    pub fn is_closer(&self, stripped: &str) -> bool {
        self.closer_end(stripped).is_some()
    }
}
