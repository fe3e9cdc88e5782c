//! Configuration system tests
//!
//! Tests for config paths, config loading and how configuration shapes rule lookup.

mod common;

use std::path::PathBuf;

use common::{run_filter, write_rules};
use fencedfilter::config_paths;
use fencedfilter::{FilterConfig, IndexRegistry, MarkupStyle, RuleLocator, ScannerOptions};
use tempfile::tempdir;

// ========================================================================
// Config Paths Tests
// ========================================================================

#[test]
fn test_config_dir_contains_app_name() {
    if let Some(dir) = config_paths::config_dir() {
        assert!(dir.ends_with("fencedfilter"));
    }
}

#[test]
fn test_config_file_ends_with_yaml() {
    if let Some(path) = config_paths::config_file() {
        assert!(path.to_string_lossy().ends_with("config.yaml"));
    }
}

#[test]
fn test_rules_and_logs_dirs_are_subdirs_of_config() {
    if let Some(config) = config_paths::config_dir() {
        assert!(config_paths::rules_dir().unwrap().starts_with(&config));
        assert!(config_paths::logs_dir().unwrap().starts_with(&config));
    }
}

// ========================================================================
// Filter Config Tests
// ========================================================================

#[test]
fn test_load_from_missing_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let config = FilterConfig::load_from(&dir.path().join("config.yaml"));
    assert_eq!(config, FilterConfig::default());
}

#[test]
fn test_load_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "markup: pre\ntext_languages: [text, log]\n").unwrap();

    let config = FilterConfig::load_from(&path);
    assert_eq!(config.markup, MarkupStyle::Pre);
    assert_eq!(config.text_languages, vec!["text", "log"]);
    assert!(config.builtin_rules);
}

#[test]
fn test_load_from_invalid_file_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "markup: [not, a, style]\n").unwrap();
    assert_eq!(FilterConfig::load_from(&path), FilterConfig::default());
}

// ========================================================================
// Config-Driven Lookup Tests
// ========================================================================

#[test]
fn test_locator_search_order_from_config() {
    let config = FilterConfig {
        rule_paths: vec![PathBuf::from("/configured")],
        ..FilterConfig::default()
    };
    let locator = RuleLocator::from_config(&config, &[PathBuf::from("/cli")]);
    let paths = locator.search_paths();

    assert_eq!(paths[0], PathBuf::from("/cli"));
    assert_eq!(paths[1], PathBuf::from("."));
    assert_eq!(paths[2], PathBuf::from("/configured"));
    assert!(locator.builtins());
}

#[test]
fn test_builtins_disabled_by_config() {
    let config = FilterConfig {
        builtin_rules: false,
        ..FilterConfig::default()
    };
    let dir = tempdir().unwrap();
    let locator = RuleLocator::from_config(&config, &[dir.path().to_path_buf()]);
    assert!(!locator.builtins());
}

#[test]
fn test_configured_rule_path_is_used() {
    let dir = tempdir().unwrap();
    write_rules(dir.path(), "demo", "keyword: em\n   shout\n");
    let config = FilterConfig {
        rule_paths: vec![dir.path().to_path_buf()],
        ..FilterConfig::default()
    };

    let mut registry = IndexRegistry::new(RuleLocator::from_config(&config, &[]));
    let out = run_filter("```demo\nshout\n```\n", &mut registry, MarkupStyle::Pre);
    assert_eq!(out, "<pre><code>\n<em>shout</em>\n</code></pre>\n");
}

#[test]
fn test_text_languages_from_config() {
    let config = FilterConfig {
        text_languages: vec!["log".to_string()],
        markup: MarkupStyle::Html,
        ..FilterConfig::default()
    };
    let options = ScannerOptions::from_config(&config);
    assert_eq!(options.markup, MarkupStyle::Html);

    let mut registry = IndexRegistry::new(RuleLocator::new(Vec::new()).with_builtins(false));
    let out = fencedfilter::filter(
        "```log\n<ok>\n```\n".as_bytes(),
        Vec::new(),
        &mut registry,
        options,
    )
    .unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "<div class=\"fragment\">\n<div class=\"line\">&lt;ok&gt;</div>\n</div>\n"
    );
}
