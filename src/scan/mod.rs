//! Source scanning
//!
//! ```text
//! Code ──/**──▶ DocBlockComment ──```lang──▶ Fenced ──```──▶ (resume)
//!  │  ──/*───▶ BlockComment ──*/──▶ Code
//!  │  ──// …\─▶ LineComment ──(no trailing \)──▶ Code
//!  └──```lang (column 0)──▶ Fenced
//! ```

mod highlight;
mod scanner;
mod state;

pub use highlight::{highlight_line, FencedLineMode};
pub use scanner::{trim_line_ending, Scanner, ScannerOptions};
pub use state::{
    fence_opener, parse_info_string, FenceContext, FenceOpener, Resume, ScanState,
    MAX_LANGUAGE_LEN, MIN_FENCE_LEN,
};

use std::io::{self, BufRead, Write};

use crate::rules::IndexRegistry;

/// Scan all of `reader` into `out` and return the writer
pub fn filter<R: BufRead, W: Write>(
    reader: R,
    out: W,
    registry: &mut IndexRegistry,
    options: ScannerOptions,
) -> io::Result<W> {
    let mut scanner = Scanner::new(out, registry, options);
    scanner.scan(reader)?;
    scanner.into_inner()
}
