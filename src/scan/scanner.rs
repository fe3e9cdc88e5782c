//! Line scanner
//!
//! Reads a source file one line at a time and copies it to the output,
//! replacing fenced code blocks inside documentation comments with
//! highlighted markup. All scan state lives in [`Scanner`]; nothing is
//! global.

use std::io::{self, BufRead, Write};

use super::highlight::FencedLineMode;
use super::state::{fence_opener, parse_info_string, FenceContext, FenceOpener, Resume, ScanState};
use crate::config::FilterConfig;
use crate::markup::MarkupStyle;
use crate::rules::{IndexRegistry, RULE_EXTENSION};

/// Output settings for a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerOptions {
    pub markup: MarkupStyle,
    /// Languages written escaped but without highlighting when no rule file exists
    pub text_languages: Vec<String>,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            markup: MarkupStyle::default(),
            text_languages: vec!["text".to_string(), "txt".to_string()],
        }
    }
}

impl ScannerOptions {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            markup: config.markup,
            text_languages: config.text_languages.clone(),
        }
    }
}

/// Scans one input stream into `out`
pub struct Scanner<'r, W: Write> {
    out: W,
    registry: &'r mut IndexRegistry,
    options: ScannerOptions,
    state: ScanState,
    fence: Option<FenceContext>,
    line_number: usize,
}

impl<'r, W: Write> Scanner<'r, W> {
    pub fn new(out: W, registry: &'r mut IndexRegistry, options: ScannerOptions) -> Self {
        Self {
            out,
            registry,
            options,
            state: ScanState::Code,
            fence: None,
            line_number: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn fence(&self) -> Option<&FenceContext> {
        self.fence.as_ref()
    }

    /// Number of lines processed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Process every line of `reader`, then close anything left open
    ///
    /// Lines are decoded lossily, so invalid UTF-8 never stops a scan.
    pub fn scan<R: BufRead>(&mut self, mut reader: R) -> io::Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            self.process_line(trim_line_ending(&line))?;
        }
        self.end_of_input()
    }

    /// Process one line given without its line ending
    pub fn process_line(&mut self, line: &str) -> io::Result<()> {
        self.line_number += 1;
        self.dispatch(line)
    }

    /// Close a fence left open at the end of the input
    pub fn end_of_input(&mut self) -> io::Result<()> {
        if let ScanState::Fenced { resume } = self.state {
            if let Some(fence) = self.fence.take() {
                tracing::warn!(
                    "Unterminated fence opened at line {}, closing at end of input",
                    fence.opened_at
                );
                if !fence.mode.is_passthrough() {
                    self.emit_line(self.options.markup.fragment_close())?;
                }
            }
            self.state = resume.into();
        }
        self.out.flush()
    }

    /// Flush and hand back the writer
    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn dispatch(&mut self, line: &str) -> io::Result<()> {
        match self.state {
            ScanState::Code => self.code_line(line, 0),
            ScanState::LineComment => self.line_comment_line(line),
            ScanState::BlockComment => self.block_comment_line(line, 0),
            ScanState::DocBlockComment => self.doc_comment_line(line, 0),
            ScanState::Fenced { resume } => self.fenced_line(line, resume),
        }
    }

    /// Code from byte `start` of `line` onwards
    fn code_line(&mut self, line: &str, start: usize) -> io::Result<()> {
        if start == 0 {
            if let Some(opener) = fence_opener(line) {
                return self.open_fence(line, 0, 0, opener, Resume::Code);
            }
        }

        let bytes = line.as_bytes();
        let mut in_string = false;
        let mut escaped = false;
        let mut i = start;
        while i < bytes.len() {
            if escaped {
                escaped = false;
                i += 1;
                continue;
            }

            match bytes[i] {
                b'\\' => escaped = true,
                b'"' => in_string = !in_string,
                b'/' if !in_string => match bytes.get(i + 1) {
                    Some(b'/') => {
                        self.emit_line(&line[start..])?;
                        if line.ends_with('\\') {
                            tracing::debug!("Line comment continues after line {}", self.line_number);
                            self.state = ScanState::LineComment;
                        }
                        return Ok(());
                    }
                    Some(b'*') => {
                        let doc = matches!(bytes.get(i + 2), Some(b'*' | b'!'))
                            && bytes
                                .get(i + 3)
                                .map_or(true, |b| b.is_ascii_whitespace());
                        let marker_end = if doc { i + 3 } else { i + 2 };
                        self.out.write_all(line[start..marker_end].as_bytes())?;

                        return if doc {
                            self.state = ScanState::DocBlockComment;
                            self.doc_comment_line(line, marker_end)
                        } else {
                            self.state = ScanState::BlockComment;
                            self.block_comment_line(line, marker_end)
                        };
                    }
                    _ => {}
                },
                _ => {}
            }
            i += 1;
        }

        self.emit_line(&line[start..])
    }

    fn line_comment_line(&mut self, line: &str) -> io::Result<()> {
        if !line.ends_with('\\') {
            self.state = ScanState::Code;
        }
        self.emit_line(line)
    }

    fn block_comment_line(&mut self, line: &str, start: usize) -> io::Result<()> {
        match line[start..].find("*/") {
            Some(pos) => {
                let end = start + pos + 2;
                self.out.write_all(line[start..end].as_bytes())?;
                self.state = ScanState::Code;
                self.code_line(line, end)
            }
            None => self.emit_line(&line[start..]),
        }
    }

    fn doc_comment_line(&mut self, line: &str, start: usize) -> io::Result<()> {
        let bytes = line.as_bytes();
        let mut i = skip_whitespace(bytes, start);
        if i == bytes.len() {
            return self.emit_line(&line[start..]);
        }
        if line[i..].starts_with("*/") {
            return self.close_doc_comment(line, start, i);
        }

        // Leading "*" decoration
        if bytes[i] == b'*' {
            i += 1;
        }
        i = skip_whitespace(bytes, i);

        if let Some(opener) = fence_opener(&line[i..]) {
            return self.open_fence(line, start, i, opener, Resume::DocBlockComment);
        }

        match line[i..].find("*/") {
            Some(pos) => self.close_doc_comment(line, start, i + pos),
            None => self.emit_line(&line[start..]),
        }
    }

    /// Emit through the `*/` at `marker` and scan the rest as code
    fn close_doc_comment(&mut self, line: &str, start: usize, marker: usize) -> io::Result<()> {
        let end = marker + 2;
        self.out.write_all(line[start..end].as_bytes())?;
        self.state = ScanState::Code;
        self.code_line(line, end)
    }

    /// Enter a fenced block whose opener starts at byte `column`
    fn open_fence(
        &mut self,
        line: &str,
        start: usize,
        column: usize,
        opener: FenceOpener,
        resume: Resume,
    ) -> io::Result<()> {
        let language = parse_info_string(&line[column + opener.count..]);
        let mode = self.select_mode(language.as_deref());

        tracing::debug!(
            "Opening fence at line {}: {}x'{}' indent {} language {:?} ({})",
            self.line_number,
            opener.count,
            opener.fence_char as char,
            column,
            language,
            mode_name(&mode)
        );

        if mode.is_passthrough() {
            self.emit_line(&line[start..])?;
        } else {
            self.emit_line(self.options.markup.fragment_open())?;
        }

        self.fence = Some(FenceContext {
            fence_char: opener.fence_char,
            count: opener.count,
            indent: column,
            language,
            mode,
            opened_at: self.line_number,
        });
        self.state = ScanState::Fenced { resume };
        Ok(())
    }

    fn select_mode(&mut self, language: Option<&str>) -> FencedLineMode {
        let Some(language) = language else {
            return FencedLineMode::Passthrough;
        };

        if let Some(index) = self.registry.get(language) {
            return FencedLineMode::Highlighted(index);
        }
        if self.options.text_languages.iter().any(|text| text == language) {
            return FencedLineMode::PlainText;
        }

        tracing::warn!("Unable to find {}.{}", language, RULE_EXTENSION);
        FencedLineMode::Passthrough
    }

    fn fenced_line(&mut self, line: &str, resume: Resume) -> io::Result<()> {
        let Some(fence) = self.fence.take() else {
            self.state = resume.into();
            return self.dispatch(line);
        };

        let stripped = fence.strip_indent(line);
        if let Some(end) = fence.closer_end(stripped) {
            tracing::debug!(
                "Closing fence from line {} at line {}",
                fence.opened_at,
                self.line_number
            );
            self.state = resume.into();
            let rest_start = line.len() - stripped.len() + end;

            if line[rest_start..].trim().is_empty() {
                return if fence.mode.is_passthrough() {
                    self.emit_line(line)
                } else {
                    self.emit_line(self.options.markup.fragment_close())
                };
            }

            // Text after the closer belongs to the state being resumed
            if fence.mode.is_passthrough() {
                self.out.write_all(line[..rest_start].as_bytes())?;
            } else {
                self.emit_line(self.options.markup.fragment_close())?;
            }
            return match resume {
                Resume::Code => self.code_line(line, rest_start),
                Resume::DocBlockComment => self.doc_comment_line(line, rest_start),
            };
        }

        fence
            .mode
            .write_line(&mut self.out, line, stripped, self.options.markup)?;
        self.fence = Some(fence);
        Ok(())
    }

    fn emit_line(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.write_all(b"\n")
    }
}

fn mode_name(mode: &FencedLineMode) -> &'static str {
    match mode {
        FencedLineMode::Highlighted(_) => "highlighted",
        FencedLineMode::PlainText => "plain text",
        FencedLineMode::Passthrough => "passthrough",
    }
}

fn skip_whitespace(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(bytes.len(), |n| from + n)
}

/// Strip `\n` and a preceding `\r`
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{HighlightIndex, RuleLocator};

    const RULES: &str = "\
!ci
keyword: span.keywordflow
   select
   from
comment: span.comment
   --
";

    fn registry() -> IndexRegistry {
        let mut registry = IndexRegistry::new(RuleLocator::new(Vec::new()).with_builtins(false));
        registry.insert(HighlightIndex::from_rules_text("sql", RULES).unwrap());
        registry
    }

    fn run_with(input: &str, markup: MarkupStyle) -> (String, ScanState) {
        let mut registry = registry();
        let options = ScannerOptions {
            markup,
            ..ScannerOptions::default()
        };
        let mut scanner = Scanner::new(Vec::new(), &mut registry, options);
        scanner.scan(input.as_bytes()).unwrap();
        let state = scanner.state();
        let out = scanner.into_inner().unwrap();
        (String::from_utf8(out).unwrap(), state)
    }

    fn run(input: &str) -> String {
        run_with(input, MarkupStyle::Html).0
    }

    #[test]
    fn test_plain_code_passes_through() {
        let input = "int main() {\n    return 0;\n}\n";
        assert_eq!(run(input), input);
    }

    #[test]
    fn test_missing_final_newline_is_added() {
        assert_eq!(run("a\nb"), "a\nb\n");
    }

    #[test]
    fn test_crlf_is_normalized() {
        assert_eq!(run("a\r\nb\r\n"), "a\nb\n");
    }

    #[test]
    fn test_doc_comment_fence_highlighted() {
        let input = "/** \n ~~~.sql\n SELECT *\n ~~~\n */\n";
        assert_eq!(
            run(input),
            "/** \n\
             <div class=\"fragment\">\n\
             <div class=\"line\"><span class=\"keywordflow\">SELECT</span> *</div>\n\
             </div>\n \
             */\n"
        );
    }

    #[test]
    fn test_star_prefixed_doc_comment() {
        let input = "/**\n * ```sql\n * select 1 -- one\n * ```\n */\nint x;\n";
        assert_eq!(
            run(input),
            "/**\n\
             <div class=\"fragment\">\n\
             <div class=\"line\"><span class=\"keywordflow\">select</span> 1 \
             <span class=\"comment\">-- one</span></div>\n\
             </div>\n \
             */\nint x;\n"
        );
    }

    #[test]
    fn test_over_long_closer_is_content() {
        let input = "```sql\nselect\n````\n```\nafter\n";
        let (out, state) = run_with(input, MarkupStyle::Pre);
        assert_eq!(
            out,
            "<pre><code>\n<span class=\"keywordflow\">select</span>\n````\n</code></pre>\nafter\n"
        );
        assert_eq!(state, ScanState::Code);
    }

    #[test]
    fn test_fence_returns_to_doc_comment() {
        let mut registry = registry();
        let mut scanner = Scanner::new(Vec::new(), &mut registry, ScannerOptions::default());
        scanner.process_line("/**").unwrap();
        assert_eq!(scanner.state(), ScanState::DocBlockComment);
        scanner.process_line(" * ```sql").unwrap();
        assert_eq!(
            scanner.state(),
            ScanState::Fenced {
                resume: Resume::DocBlockComment
            }
        );
        assert_eq!(scanner.fence().map(|f| f.indent), Some(3));
        scanner.process_line(" * ```").unwrap();
        assert_eq!(scanner.state(), ScanState::DocBlockComment);
        assert!(scanner.fence().is_none());
        scanner.process_line(" */").unwrap();
        assert_eq!(scanner.state(), ScanState::Code);
    }

    #[test]
    fn test_unknown_language_passes_through() {
        let input = "/**\n * ```cobol\n * MOVE A TO B\n * ```\n */\n";
        assert_eq!(run(input), input);
    }

    #[test]
    fn test_fence_without_language_passes_through() {
        let input = "/**\n ~~~\n select\n ~~~\n */\n";
        assert_eq!(run(input), input);
    }

    #[test]
    fn test_text_language_is_escaped_not_highlighted() {
        let input = "/**\n ```text\n select <b>\n ```\n */\n";
        assert_eq!(
            run(input),
            "/**\n<div class=\"fragment\">\n<div class=\"line\">select &lt;b&gt;</div>\n</div>\n */\n"
        );
    }

    #[test]
    fn test_short_fenced_line_is_empty() {
        let input = "/**\n   ```sql\n\n   select\n   ```\n */\n";
        assert_eq!(
            run(input),
            "/**\n<div class=\"fragment\">\n<div class=\"line\"></div>\n\
             <div class=\"line\"><span class=\"keywordflow\">select</span></div>\n</div>\n */\n"
        );
    }

    #[test]
    fn test_comment_marker_in_string_ignored() {
        let input = "char *s = \"/** not a comment\";\n```sql\n";
        let (out, state) = run_with(input, MarkupStyle::Html);
        assert!(out.starts_with("char *s = \"/** not a comment\";\n"));
        // The fence after the string line still opens from code
        assert_eq!(state, ScanState::Code);
        assert!(out.ends_with("<div class=\"fragment\">\n</div>\n"));
    }

    #[test]
    fn test_escaped_quote_keeps_string_open() {
        let input = "s = \"a \\\" /* b\";\nnext\n";
        let (out, state) = run_with(input, MarkupStyle::Html);
        assert_eq!(out, input);
        assert_eq!(state, ScanState::Code);
    }

    #[test]
    fn test_block_comment_is_not_doc() {
        let input = "/* ```sql\nselect\n``` */ x\n";
        let (out, state) = run_with(input, MarkupStyle::Html);
        assert_eq!(out, input);
        assert_eq!(state, ScanState::Code);
    }

    #[test]
    fn test_empty_block_comment_closes() {
        let mut registry = registry();
        let mut scanner = Scanner::new(Vec::new(), &mut registry, ScannerOptions::default());
        scanner.process_line("x /**/ y").unwrap();
        assert_eq!(scanner.state(), ScanState::Code);
        scanner.process_line("/*!").unwrap();
        assert_eq!(scanner.state(), ScanState::DocBlockComment);
    }

    #[test]
    fn test_doc_comment_closed_then_code() {
        let input = "/** brief */ int x; /* c\n*/\n";
        let (out, state) = run_with(input, MarkupStyle::Html);
        assert_eq!(out, input);
        assert_eq!(state, ScanState::Code);
    }

    #[test]
    fn test_line_comment_continuation() {
        let mut registry = registry();
        let mut scanner = Scanner::new(Vec::new(), &mut registry, ScannerOptions::default());
        scanner.process_line("// a \\").unwrap();
        assert_eq!(scanner.state(), ScanState::LineComment);
        scanner.process_line("/** still comment \\").unwrap();
        assert_eq!(scanner.state(), ScanState::LineComment);
        scanner.process_line("done").unwrap();
        assert_eq!(scanner.state(), ScanState::Code);
    }

    #[test]
    fn test_unterminated_fence_closed_at_end() {
        let (out, state) = run_with("```sql\nselect", MarkupStyle::Pre);
        assert_eq!(
            out,
            "<pre><code>\n<span class=\"keywordflow\">select</span>\n</code></pre>\n"
        );
        assert_eq!(state, ScanState::Code);
    }

    #[test]
    fn test_unterminated_passthrough_fence_adds_nothing() {
        let (out, _) = run_with("/**\n ```\n x\n", MarkupStyle::Pre);
        assert_eq!(out, "/**\n ```\n x\n");
    }

    #[test]
    fn test_doxygen_markup() {
        let (out, _) = run_with("```sql\nfrom\n```\n", MarkupStyle::Doxygen);
        assert_eq!(
            out,
            "  @htmlonly <div class=\"fragment\">\n\
             \x20 <div class=\"line\"><span class=\"keywordflow\">from</span></div>\n\
             \x20 </div> @endhtmlonly\n"
        );
    }

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending("a\r\n"), "a");
        assert_eq!(trim_line_ending("a\n"), "a");
        assert_eq!(trim_line_ending("a\r"), "a");
        assert_eq!(trim_line_ending("a"), "a");
    }
}
