//! Highlight rules
//!
//! Loads `<language>.hl` rule files into a tree and compiles each tree into
//! a [`HighlightIndex`] used to find keywords and comment markers inside
//! fenced code.
//!
//! ## Architecture
//!
//! ```text
//! <language>.hl → loader → HighlightTree → HighlightIndex
//!                                              ↑
//!                 IndexRegistry (one per language, cached for the run)
//! ```

pub mod builtin;
mod index;
mod loader;
mod node;
mod registry;

pub use index::{HighlightIndex, NameChars, TagMatch};
pub use loader::{load_rules, parse_rule_line, ParsedLine, RuleError, RuleFlag, RuleFlags, RuleLine};
pub use node::{resolve_escapes, HighlightTree, NodeId, Siblings};
pub use registry::{IndexRegistry, RuleLocator, RuleSource, RULE_EXTENSION};
