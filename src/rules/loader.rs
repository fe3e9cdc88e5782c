//! Rule file loader
//!
//! Rule files (`<language>.hl`) are indentation-delimited outlines:
//!
//! ```text
//! !ci                      # flag: case-insensitive tags
//! keyword: span.keywordflow
//!    select
//!    from
//! comment: span.comment
//!    --
//!    /*
//! ```
//!
//! Leading spaces give the depth, `tag: value` or a bare `tag` gives the
//! node, `#` starts a trailing comment and `\X` takes `X` literally.

use std::fmt;
use std::io::{self, BufRead};
use std::path::PathBuf;

use super::node::{HighlightTree, NodeId};

/// Errors raised while reading a rule file
#[derive(Debug)]
pub enum RuleError {
    /// The rule file exists but could not be opened
    Open { path: PathBuf, source: io::Error },
    /// Reading from an opened rule source failed
    Read(io::Error),
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::Open { path, source } => {
                write!(f, "Unable to open {}: {}", path.display(), source)
            }
            RuleError::Read(e) => write!(f, "Error reading rule file: {}", e),
        }
    }
}

impl std::error::Error for RuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuleError::Open { source, .. } => Some(source),
            RuleError::Read(e) => Some(e),
        }
    }
}

impl From<io::Error> for RuleError {
    fn from(e: io::Error) -> Self {
        RuleError::Read(e)
    }
}

/// Flag directive found at column zero of a rule file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFlag {
    /// `!ht` or `!hyphen...`: hyphens are name characters
    HyphenatedTags,
    /// `!ci` or `!case-i...`: tags match regardless of case
    CaseInsensitive,
}

/// Parsing flags collected while loading a rule file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFlags {
    pub hyphenated_tags: bool,
    pub case_insensitive: bool,
}

impl RuleFlags {
    fn set(&mut self, flag: RuleFlag) {
        match flag {
            RuleFlag::HyphenatedTags => self.hyphenated_tags = true,
            RuleFlag::CaseInsensitive => self.case_insensitive = true,
        }
    }
}

/// One node line of a rule file, escapes still unresolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    pub depth: usize,
    pub tag: String,
    pub value: Option<String>,
}

/// Classification of a single raw rule file line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Blank or comment-only line
    Skip,
    Flag(RuleFlag),
    Node(RuleLine),
}

/// Parse one raw line of a rule file
pub fn parse_rule_line(line: &str) -> ParsedLine {
    let line = line.trim_end_matches(['\n', '\r']);
    let body = line.trim_start_matches([' ', '\t']);
    let depth = line.len() - body.len();

    if body.is_empty() {
        return ParsedLine::Skip;
    }

    if depth == 0 {
        if let Some(flag) = parse_flag(body) {
            return ParsedLine::Flag(flag);
        }
    }

    let tag_end = scan_until(body, |c| c == ':' || c == '#' || c.is_whitespace());
    let tag = &body[..tag_end];
    if tag.is_empty() {
        return ParsedLine::Skip;
    }

    // Anything between the tag and the colon is ignored
    let rest = &body[tag_end..];
    let marker = scan_until(rest, |c| c == ':' || c == '#');
    let value = rest[marker..].strip_prefix(':').and_then(|after| {
        let end = scan_until(after, |c| c == '#');
        let value = trim_unescaped_end(after[..end].trim_start());
        (!value.is_empty()).then(|| value.to_string())
    });

    ParsedLine::Node(RuleLine {
        depth,
        tag: tag.to_string(),
        value,
    })
}

fn parse_flag(body: &str) -> Option<RuleFlag> {
    let directive = body.strip_prefix('!')?;
    let name = directive
        .split(|c: char| c.is_whitespace() || c == '#')
        .next()
        .unwrap_or_default();

    match name {
        "ht" => Some(RuleFlag::HyphenatedTags),
        "ci" => Some(RuleFlag::CaseInsensitive),
        _ if name.starts_with("hyphen") => Some(RuleFlag::HyphenatedTags),
        _ if name.starts_with("case-i") => Some(RuleFlag::CaseInsensitive),
        _ => None,
    }
}

/// Byte offset of the first unescaped char satisfying `stop`, or the length
fn scan_until(text: &str, stop: impl Fn(char) -> bool) -> usize {
    let mut chars = text.char_indices();
    while let Some((i, ch)) = chars.next() {
        if ch == '\\' {
            chars.next();
            continue;
        }
        if stop(ch) {
            return i;
        }
    }
    text.len()
}

/// Trim trailing whitespace that is not protected by a backslash
fn trim_unescaped_end(text: &str) -> &str {
    let mut end = text.len();
    while let Some(ch) = text[..end].chars().next_back() {
        if !ch.is_whitespace() {
            break;
        }
        let before = &text[..end - ch.len_utf8()];
        let backslashes = before.bytes().rev().take_while(|b| *b == b'\\').count();
        if backslashes % 2 == 1 {
            break;
        }
        end = before.len();
    }
    &text[..end]
}

/// Populate `tree` from a rule file stream, returning the flags it declared
pub fn load_rules<R: BufRead>(reader: R, tree: &mut HighlightTree) -> Result<RuleFlags, RuleError> {
    let mut parser = RuleParser {
        reader,
        buf: String::new(),
        pending: None,
        flags: RuleFlags::default(),
        line_number: 0,
    };

    let root = tree.root();
    parser.advance()?;
    parser.build(tree, root, None)?;

    tracing::debug!(
        "Loaded {} rule nodes for '{}' ({} lines)",
        tree.len() - 1,
        tree.name(),
        parser.line_number
    );
    Ok(parser.flags)
}

/// Recursive-descent outline builder with one line of lookahead
struct RuleParser<R> {
    reader: R,
    buf: String,
    pending: Option<RuleLine>,
    flags: RuleFlags,
    line_number: usize,
}

impl<R: BufRead> RuleParser<R> {
    /// Read forward to the next node line, applying flags on the way
    fn advance(&mut self) -> Result<(), RuleError> {
        self.pending = None;
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(());
            }
            self.line_number += 1;

            match parse_rule_line(&self.buf) {
                ParsedLine::Skip => {}
                ParsedLine::Flag(flag) => self.flags.set(flag),
                ParsedLine::Node(line) => {
                    self.pending = Some(line);
                    return Ok(());
                }
            }
        }
    }

    /// Attach pending lines below or beside `host`
    ///
    /// `entry_depth` is the depth of `host` (`None` for the root). Returns
    /// with a shallower line still pending for an enclosing frame.
    fn build(
        &mut self,
        tree: &mut HighlightTree,
        mut host: NodeId,
        entry_depth: Option<usize>,
    ) -> Result<(), RuleError> {
        while let Some(line) = self.pending.take() {
            match entry_depth {
                Some(depth) if line.depth < depth => {
                    self.pending = Some(line);
                    break;
                }
                Some(depth) if line.depth == depth => {
                    host = tree.direct_add_sibling(host, &line.tag, line.value.as_deref());
                    self.advance()?;
                }
                _ => {
                    // A partial dedent can return here after host already
                    // gained children; append rather than replace them.
                    let child = if tree.first_child(host).is_some() {
                        tree.add_child(host, &line.tag, line.value.as_deref())
                    } else {
                        tree.direct_add_child(host, &line.tag, line.value.as_deref())
                    };
                    self.advance()?;
                    self.build(tree, child, Some(line.depth))?;
                }
            }
        }
        Ok(())
    }
}
