//! Rule file lookup and the per-run index registry
//!
//! Search order for `<language>.hl`:
//! 1. Directories given on the command line (`--rules-dir`)
//! 2. The current directory
//! 3. `rule_paths` from `config.yaml`
//! 4. `~/.config/fencedfilter/rules/`
//! 5. Built-in rule files compiled into the binary

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::builtin::builtin_rules;
use super::index::HighlightIndex;
use super::loader::RuleError;
use crate::config::FilterConfig;

/// Rule file extension
pub const RULE_EXTENSION: &str = "hl";

/// Where a language's rules were found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    File(PathBuf),
    Builtin(&'static str),
}

/// Finds the rule file for a language
#[derive(Debug, Clone)]
pub struct RuleLocator {
    search_paths: Vec<PathBuf>,
    builtins: bool,
}

impl Default for RuleLocator {
    /// Current directory, then built-ins
    fn default() -> Self {
        Self::new(vec![PathBuf::from(".")])
    }
}

impl RuleLocator {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self {
            search_paths,
            builtins: true,
        }
    }

    /// Build the full search path from configuration
    ///
    /// `extra_dirs` come from the command line and are searched first.
    pub fn from_config(config: &FilterConfig, extra_dirs: &[PathBuf]) -> Self {
        let mut search_paths: Vec<PathBuf> = extra_dirs.to_vec();
        search_paths.push(PathBuf::from("."));
        search_paths.extend(config.rule_paths.iter().cloned());
        if let Some(dir) = crate::config_paths::rules_dir() {
            search_paths.push(dir);
        }

        Self {
            search_paths,
            builtins: config.builtin_rules,
        }
    }

    pub fn with_builtins(mut self, enabled: bool) -> Self {
        self.builtins = enabled;
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn builtins(&self) -> bool {
        self.builtins
    }

    /// Path of the rule file for `language` inside `dir`
    pub fn rule_file_in(dir: &Path, language: &str) -> PathBuf {
        dir.join(format!("{}.{}", language, RULE_EXTENSION))
    }

    pub fn locate(&self, language: &str) -> Option<RuleSource> {
        if !is_plain_language(language) {
            tracing::debug!("Refusing to look up rules for '{}'", language);
            return None;
        }

        let on_disk = self
            .search_paths
            .iter()
            .map(|dir| Self::rule_file_in(dir, language))
            .find(|path| path.is_file());
        if let Some(path) = on_disk {
            return Some(RuleSource::File(path));
        }

        if self.builtins {
            return builtin_rules(language).map(RuleSource::Builtin);
        }
        None
    }
}

/// Language identifiers never name a path
fn is_plain_language(language: &str) -> bool {
    !language.is_empty() && !language.contains(['/', '\\']) && !language.starts_with('.')
}

/// Language name to index map, filled lazily and never evicted
#[derive(Debug, Default)]
pub struct IndexRegistry {
    locator: RuleLocator,
    indices: HashMap<String, Option<Rc<HighlightIndex>>>,
}

impl IndexRegistry {
    pub fn new(locator: RuleLocator) -> Self {
        Self {
            locator,
            indices: HashMap::new(),
        }
    }

    pub fn locator(&self) -> &RuleLocator {
        &self.locator
    }

    /// Index for `language`, loading its rule file on first request
    ///
    /// Misses and empty rule files are cached too, so each language is
    /// looked up at most once. Returns `None` when there is nothing to
    /// highlight with.
    pub fn get(&mut self, language: &str) -> Option<Rc<HighlightIndex>> {
        let locator = &self.locator;
        let entry = self
            .indices
            .entry(language.to_string())
            .or_insert_with(|| load_index(locator, language));

        entry.as_ref().filter(|index| !index.is_empty()).cloned()
    }

    /// Register an index built elsewhere, replacing any cached entry
    pub fn insert(&mut self, index: HighlightIndex) -> Rc<HighlightIndex> {
        let index = Rc::new(index);
        self.indices
            .insert(index.name().to_string(), Some(Rc::clone(&index)));
        index
    }

    /// Whether `language` has been requested (hit or miss)
    pub fn is_cached(&self, language: &str) -> bool {
        self.indices.contains_key(language)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Print the parsed rule tree for `language` followed by its index listing
    pub fn write_dump<W: Write>(&mut self, language: &str, out: &mut W) -> io::Result<()> {
        match self.get(language) {
            Some(index) => {
                index.tree().write_outline(out)?;
                index.write_listing(out)
            }
            None => writeln!(out, "No rule file found for {}.", language),
        }
    }
}

fn load_index(locator: &RuleLocator, language: &str) -> Option<Rc<HighlightIndex>> {
    let source = locator.locate(language)?;

    let result = match &source {
        RuleSource::File(path) => {
            tracing::info!("Loading rules for '{}' from {}", language, path.display());
            File::open(path)
                .map_err(|source| RuleError::Open {
                    path: path.clone(),
                    source,
                })
                .and_then(|file| HighlightIndex::parse(language, BufReader::new(file)))
        }
        RuleSource::Builtin(text) => {
            tracing::info!("Loading builtin rules for '{}'", language);
            HighlightIndex::from_rules_text(language, text)
        }
    };

    match result {
        Ok(index) => Some(Rc::new(index)),
        Err(e) => {
            tracing::warn!("Failed to load rules for '{}': {}", language, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_locate_prefers_disk_over_builtin() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("sql.hl"), "keyword: span.k\n   foo\n").unwrap();

        let locator = RuleLocator::new(vec![dir.path().to_path_buf()]);
        assert_eq!(
            locator.locate("sql"),
            Some(RuleSource::File(dir.path().join("sql.hl")))
        );

        let empty = tempdir().unwrap();
        let locator = RuleLocator::new(vec![empty.path().to_path_buf()]);
        assert!(matches!(locator.locate("sql"), Some(RuleSource::Builtin(_))));
        assert_eq!(locator.with_builtins(false).locate("sql"), None);
    }

    #[test]
    fn test_locate_rejects_paths() {
        let locator = RuleLocator::default();
        assert_eq!(locator.locate("../etc/passwd"), None);
        assert_eq!(locator.locate(".hidden"), None);
        assert_eq!(locator.locate(""), None);
    }

    #[test]
    fn test_registry_returns_cached_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demo.hl");
        fs::write(&path, "keyword: span.k\n   foo\n").unwrap();

        let mut registry =
            IndexRegistry::new(RuleLocator::new(vec![dir.path().to_path_buf()]).with_builtins(false));
        let first = registry.get("demo").unwrap();

        // A second request must not go back to disk
        fs::remove_file(&path).unwrap();
        let second = registry.get("demo").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_caches_misses() {
        let dir = tempdir().unwrap();
        let mut registry =
            IndexRegistry::new(RuleLocator::new(vec![dir.path().to_path_buf()]).with_builtins(false));
        assert!(registry.get("cobol").is_none());
        assert!(registry.is_cached("cobol"));

        // Appearing later does not matter for this run
        fs::write(dir.path().join("cobol.hl"), "keyword: span.k\n   move\n").unwrap();
        assert!(registry.get("cobol").is_none());
    }

    #[test]
    fn test_registry_empty_rules_are_unusable() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("blank.hl"), "# nothing\n\n").unwrap();
        let mut registry =
            IndexRegistry::new(RuleLocator::new(vec![dir.path().to_path_buf()]).with_builtins(false));
        assert!(registry.get("blank").is_none());
        assert!(registry.is_cached("blank"));
    }

    #[test]
    fn test_write_dump() {
        let mut registry = IndexRegistry::new(RuleLocator::new(Vec::new()).with_builtins(false));
        registry.insert(
            HighlightIndex::from_rules_text("demo", "!ci\nkeyword: span.k\n   Foo\n").unwrap(),
        );

        let mut out = Vec::new();
        registry.write_dump("demo", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("/\n   \"keyword\": \"span.k\"\n      \"foo\"\n"));
        assert!(text.contains("Processing case-insensitive tags."));

        let mut out = Vec::new();
        registry.write_dump("cobol", &mut out).unwrap();
        assert_eq!(out, b"No rule file found for cobol.\n");
    }

    #[test]
    fn test_registry_insert() {
        let mut registry = IndexRegistry::new(RuleLocator::new(Vec::new()).with_builtins(false));
        let index =
            HighlightIndex::from_rules_text("demo", "keyword: span.k\n   foo\n").unwrap();
        let inserted = registry.insert(index);
        let fetched = registry.get("demo").unwrap();
        assert!(Rc::ptr_eq(&inserted, &fetched));
    }
}
