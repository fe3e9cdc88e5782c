//! Rule files compiled into the binary
//!
//! Used when no `<language>.hl` is found on the search path.

pub const SQL_RULES: &str = include_str!("../../rules/sql.hl");
pub const C_RULES: &str = include_str!("../../rules/c.hl");
pub const CSS_RULES: &str = include_str!("../../rules/css.hl");

/// A built-in rule file entry
pub struct BuiltinRules {
    /// Language identifier as written in a fence info string
    pub language: &'static str,
    /// Embedded rule file content
    pub rules: &'static str,
}

/// Registry of all built-in rule files
pub const BUILTIN_RULES: &[BuiltinRules] = &[
    BuiltinRules {
        language: "sql",
        rules: SQL_RULES,
    },
    BuiltinRules {
        language: "c",
        rules: C_RULES,
    },
    BuiltinRules {
        language: "css",
        rules: CSS_RULES,
    },
];

/// Find the embedded rules for `language`
pub fn builtin_rules(language: &str) -> Option<&'static str> {
    BUILTIN_RULES
        .iter()
        .find(|entry| entry.language == language)
        .map(|entry| entry.rules)
}
