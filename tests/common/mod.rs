//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use fencedfilter::{filter, IndexRegistry, MarkupStyle, RuleLocator, ScannerOptions};

/// SQL rules matching the documented `keyword` → `keywordflow` example
pub const SQL_RULES: &str = "\
# test rules
!ci
keyword: span.keywordflow
   select
   from
   where
type: span.keywordtype
   int
   integer
comment: span.comment
   --
";

/// Write `<language>.hl` into `dir`
pub fn write_rules(dir: &Path, language: &str, rules: &str) {
    fs::write(dir.join(format!("{}.hl", language)), rules).unwrap();
}

/// Registry searching only `dir`, without built-in rules
pub fn registry_for(dir: &Path) -> IndexRegistry {
    IndexRegistry::new(RuleLocator::new(vec![dir.to_path_buf()]).with_builtins(false))
}

/// Registry using only the built-in rules
pub fn builtin_registry() -> IndexRegistry {
    IndexRegistry::new(RuleLocator::new(Vec::new()))
}

/// Scanner options with the given markup style and default text languages
pub fn options(markup: MarkupStyle) -> ScannerOptions {
    ScannerOptions {
        markup,
        ..ScannerOptions::default()
    }
}

/// Filter `input` and return the output as a string
pub fn run_filter(input: &str, registry: &mut IndexRegistry, markup: MarkupStyle) -> String {
    let out = filter(input.as_bytes(), Vec::new(), registry, options(markup)).unwrap();
    String::from_utf8(out).unwrap()
}
