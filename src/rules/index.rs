//! Highlight index
//!
//! Flattens the leaves of a [`HighlightTree`] into two sorted lookup sets:
//! word tags (starting with a name character) and comment markers (starting
//! with anything else that is not whitespace). Lookups are prefix matches
//! against a position in a fenced line.

use std::io::{self, BufRead, Write};

use super::loader::{load_rules, RuleError, RuleFlags};
use super::node::{HighlightTree, NodeId};

/// Which characters may form a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameChars {
    /// ASCII letters, digits and underscore
    #[default]
    Simple,
    /// As `Simple`, plus the hyphen
    Hyphenated,
}

impl NameChars {
    pub fn from_flags(flags: RuleFlags) -> Self {
        if flags.hyphenated_tags {
            NameChars::Hyphenated
        } else {
            NameChars::Simple
        }
    }

    #[inline]
    pub fn allows(self, byte: u8) -> bool {
        byte.is_ascii_alphanumeric()
            || byte == b'_'
            || (self == NameChars::Hyphenated && byte == b'-')
    }

    /// Length in bytes of the run of name characters at the start of `text`
    pub fn word_len(self, text: &str) -> usize {
        text.bytes().take_while(|b| self.allows(*b)).count()
    }
}

/// A rule tag matched at a position in a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMatch {
    pub node: NodeId,
    /// Number of bytes of the line covered by the tag
    pub len: usize,
}

/// Compiled lookup structure for one language
#[derive(Debug, Clone)]
pub struct HighlightIndex {
    tree: HighlightTree,
    words: Vec<NodeId>,
    comments: Vec<NodeId>,
    flags: RuleFlags,
    name_chars: NameChars,
}

impl HighlightIndex {
    /// Build the index from a loaded tree
    ///
    /// Only leaves two levels below the root are indexed. With
    /// `case_insensitive` set their tags are folded to lower case first.
    pub fn new(mut tree: HighlightTree, flags: RuleFlags) -> Self {
        let name_chars = NameChars::from_flags(flags);

        let leaves: Vec<NodeId> = tree
            .children(tree.root())
            .flat_map(|category| tree.children(category))
            .collect();

        let mut words = Vec::new();
        let mut comments = Vec::new();
        for leaf in leaves {
            if flags.case_insensitive {
                tree.fold_tag_case(leaf);
            }
            match tree.tag(leaf).bytes().next() {
                Some(first) if name_chars.allows(first) => words.push(leaf),
                Some(first) if !first.is_ascii_whitespace() => comments.push(leaf),
                _ => {}
            }
        }

        words.sort_by(|a, b| tree.tag(*a).cmp(tree.tag(*b)));
        comments.sort_by(|a, b| tree.tag(*a).cmp(tree.tag(*b)));

        tracing::debug!(
            "Indexed '{}': {} words, {} comment markers (hyphenated: {}, case-insensitive: {})",
            tree.name(),
            words.len(),
            comments.len(),
            flags.hyphenated_tags,
            flags.case_insensitive
        );

        Self {
            tree,
            words,
            comments,
            flags,
            name_chars,
        }
    }

    /// Load a rule file stream and index it
    pub fn parse<R: BufRead>(name: &str, reader: R) -> Result<Self, RuleError> {
        let mut tree = HighlightTree::new(name);
        let flags = load_rules(reader, &mut tree)?;
        Ok(Self::new(tree, flags))
    }

    /// Index rule file text held in memory
    pub fn from_rules_text(name: &str, text: &str) -> Result<Self, RuleError> {
        Self::parse(name, text.as_bytes())
    }

    pub fn name(&self) -> &str {
        self.tree.name()
    }

    pub fn tree(&self) -> &HighlightTree {
        &self.tree
    }

    /// True when the rule file was absent or held no usable entries
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.comments.is_empty()
    }

    pub fn hyphenated_tags(&self) -> bool {
        self.flags.hyphenated_tags
    }

    pub fn case_insensitive(&self) -> bool {
        self.flags.case_insensitive
    }

    pub fn name_chars(&self) -> NameChars {
        self.name_chars
    }

    #[inline]
    pub fn is_name_char(&self, byte: u8) -> bool {
        self.name_chars.allows(byte)
    }

    /// Sorted word tags
    pub fn word_tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.iter().map(|id| self.tree.tag(*id))
    }

    /// Sorted comment-marker tags
    pub fn comment_tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.comments.iter().map(|id| self.tree.tag(*id))
    }

    /// Exact lookup of a tag in either set
    pub fn seek(&self, tag: &str) -> Option<NodeId> {
        let folded;
        let tag = if self.flags.case_insensitive {
            folded = tag.to_ascii_lowercase();
            folded.as_str()
        } else {
            tag
        };

        [&self.words, &self.comments].into_iter().find_map(|set| {
            set.binary_search_by(|id| self.tree.tag(*id).cmp(tag))
                .ok()
                .map(|pos| set[pos])
        })
    }

    /// Match a word tag at the start of `text`
    ///
    /// The character after the tag must not be a name character, so `int`
    /// never matches inside `integer`. The first qualifying tag in sorted
    /// order wins, which makes `background` beat `background-color` unless
    /// hyphens are name characters.
    pub fn seek_word(&self, text: &str) -> Option<TagMatch> {
        self.candidates(&self.words, text)
            .find(|m| self.prefix_matches(text.as_bytes(), self.tree.tag(m.node).as_bytes(), true))
    }

    /// Match a comment marker at the start of `text`
    ///
    /// The first marker in sorted order wins, so a marker that is a prefix
    /// of another (`#if` and `#ifdef`) shadows the longer one.
    pub fn seek_comment(&self, text: &str) -> Option<TagMatch> {
        self.candidates(&self.comments, text)
            .find(|m| self.prefix_matches(text.as_bytes(), self.tree.tag(m.node).as_bytes(), false))
    }

    /// The category node a matched leaf belongs to
    pub fn category(&self, node: NodeId) -> Option<NodeId> {
        self.tree.parent(node)
    }

    /// Markup value of the category a matched leaf belongs to
    pub fn markup_value(&self, node: NodeId) -> Option<&str> {
        self.category(node).and_then(|category| self.tree.value(category))
    }

    fn fold(&self, byte: u8) -> u8 {
        if self.flags.case_insensitive {
            byte.to_ascii_lowercase()
        } else {
            byte
        }
    }

    /// Tags of `set` sharing the (folded) first byte of `text`
    fn candidates<'a>(&'a self, set: &'a [NodeId], text: &str) -> impl Iterator<Item = TagMatch> + 'a {
        let first = text.as_bytes().first().map(|b| self.fold(*b));

        // Tags are sorted, so candidates sharing the first byte are contiguous
        let start = match first {
            Some(first) => set.partition_point(|id| self.tree.tag(*id).as_bytes()[0] < first),
            None => set.len(),
        };
        set[start..]
            .iter()
            .take_while(move |id| Some(self.tree.tag(**id).as_bytes()[0]) == first)
            .map(move |id| TagMatch {
                node: *id,
                len: self.tree.tag(*id).len(),
            })
    }

    fn prefix_matches(&self, haystack: &[u8], needle: &[u8], word_boundary: bool) -> bool {
        if haystack.len() < needle.len() {
            return false;
        }
        let (head, tail) = haystack.split_at(needle.len());

        let equal = if self.flags.case_insensitive {
            head.iter().zip(needle).all(|(h, n)| h.to_ascii_lowercase() == *n)
        } else {
            head == needle
        };

        equal && (!word_boundary || tail.first().map_or(true, |b| !self.name_chars.allows(*b)))
    }

    /// Write the flags and both sorted sets, one quoted tag per line
    pub fn write_listing<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out)?;
        if self.flags.hyphenated_tags {
            writeln!(out, "Processing with hyphenated tags.")?;
        }
        if self.flags.case_insensitive {
            writeln!(out, "Processing case-insensitive tags.")?;
        }

        if !self.words.is_empty() {
            writeln!(out, "\nListing tags:")?;
            for tag in self.word_tags() {
                writeln!(out, "\"{}\"", tag)?;
            }
        }
        if !self.comments.is_empty() {
            writeln!(out, "\nListing comments:")?;
            for tag in self.comment_tags() {
                writeln!(out, "\"{}\"", tag)?;
            }
        }
        Ok(())
    }
}
