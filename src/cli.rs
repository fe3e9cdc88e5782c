//! Command-line argument parsing
//!
//! Supports:
//! - Filtering one source file to stdout
//! - Extra rule directories and markup style overrides
//! - Dumping the parsed rules of a language

use clap::Parser;
use std::path::PathBuf;

use crate::config::FilterConfig;
use crate::markup::MarkupStyle;

/// Highlights fenced code blocks inside documentation comments
#[derive(Parser, Debug)]
#[command(
    name = "fencedfilter",
    version,
    about = "Highlights fenced code blocks inside documentation comments"
)]
pub struct CliArgs {
    /// Source file to filter
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Directory searched for <language>.hl before the configured ones (repeatable)
    #[arg(long = "rules-dir", value_name = "DIR")]
    pub rules_dirs: Vec<PathBuf>,

    /// Markup placed around highlighted fragments
    #[arg(long, value_enum, value_name = "STYLE")]
    pub markup: Option<MarkupStyle>,

    /// Never fall back to the rule files compiled into the binary
    #[arg(long)]
    pub no_builtin_rules: bool,

    /// Print the parsed rules for LANG and exit (repeatable)
    #[arg(long, value_name = "LANG")]
    pub dump: Vec<String>,
}

/// What the binary does this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Filter a source file to stdout
    Filter(PathBuf),
    /// Print rule trees and listings
    Dump(Vec<String>),
    /// Run the built-in sample (debug builds)
    SelfTest,
    /// Print usage
    Usage,
}

/// Configuration derived from CLI arguments layered over `config.yaml`
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    pub filter: FilterConfig,
    /// Searched before every other rule directory
    pub rules_dirs: Vec<PathBuf>,
}

impl CliArgs {
    /// Apply the arguments on top of `config`
    pub fn into_run_config(self, mut config: FilterConfig) -> RunConfig {
        if let Some(markup) = self.markup {
            config.markup = markup;
        }
        if self.no_builtin_rules {
            config.builtin_rules = false;
        }

        let mode = if !self.dump.is_empty() {
            RunMode::Dump(self.dump)
        } else if let Some(input) = self.input {
            RunMode::Filter(input)
        } else if cfg!(debug_assertions) {
            RunMode::SelfTest
        } else {
            RunMode::Usage
        };

        RunConfig {
            mode,
            filter: config,
            rules_dirs: self.rules_dirs,
        }
    }
}
