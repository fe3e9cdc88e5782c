//! fencedfilter - fenced code highlighting for documentation comments
//!
//! Copies a source file through unchanged except for fenced code blocks
//! inside `/** */` and `/*! */` comments, which are replaced with HTML
//! markup highlighting keywords and comments per `<language>.hl` rules.

pub mod cli;
pub mod config;
pub mod config_paths;
pub mod markup;
pub mod rules;
pub mod scan;
pub mod tracing;

// Re-export commonly used types
pub use config::FilterConfig;
pub use markup::MarkupStyle;
pub use rules::{HighlightIndex, IndexRegistry, RuleLocator};
pub use scan::{filter, Scanner, ScannerOptions};
