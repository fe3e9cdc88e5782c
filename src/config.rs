//! Filter configuration
//!
//! Read from `~/.config/fencedfilter/config.yaml`. Every field is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::markup::MarkupStyle;

/// Settings shared by every run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Extra directories searched for `<language>.hl`
    #[serde(default)]
    pub rule_paths: Vec<PathBuf>,

    /// Fall back to the rule files compiled into the binary
    #[serde(default = "default_true")]
    pub builtin_rules: bool,

    /// Markup placed around fenced fragments
    #[serde(default)]
    pub markup: MarkupStyle,

    /// Languages written escaped but unhighlighted
    #[serde(default = "default_text_languages")]
    pub text_languages: Vec<String>,

    /// Also write debug logs under `~/.config/fencedfilter/logs/`
    #[serde(default)]
    pub log_to_file: bool,
}

fn default_true() -> bool {
    true
}

fn default_text_languages() -> Vec<String> {
    vec!["text".to_string(), "txt".to_string()]
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            rule_paths: Vec::new(),
            builtin_rules: true,
            markup: MarkupStyle::default(),
            text_languages: default_text_languages(),
            log_to_file: false,
        }
    }
}

impl FilterConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`, falling back to defaults on any failure
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_yaml(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse config text; an empty document yields the defaults
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FilterConfig::default();
        assert!(config.rule_paths.is_empty());
        assert!(config.builtin_rules);
        assert_eq!(config.markup, MarkupStyle::Doxygen);
        assert_eq!(config.text_languages, vec!["text", "txt"]);
        assert!(!config.log_to_file);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = FilterConfig::from_yaml("markup: html\n").unwrap();
        assert_eq!(config.markup, MarkupStyle::Html);
        assert!(config.builtin_rules);
        assert_eq!(config.text_languages, vec!["text", "txt"]);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = "\
rule_paths:
  - /opt/rules
  - rules
builtin_rules: false
markup: pre
text_languages: [plain]
log_to_file: true
";
        let config = FilterConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.rule_paths,
            vec![PathBuf::from("/opt/rules"), PathBuf::from("rules")]
        );
        assert!(!config.builtin_rules);
        assert_eq!(config.markup, MarkupStyle::Pre);
        assert_eq!(config.text_languages, vec!["plain"]);
        assert!(config.log_to_file);
    }

    #[test]
    fn test_empty_yaml() {
        assert_eq!(FilterConfig::from_yaml("").unwrap(), FilterConfig::default());
    }

    #[test]
    fn test_invalid_markup_is_error() {
        assert!(FilterConfig::from_yaml("markup: latex\n").is_err());
    }

    #[test]
    fn test_roundtrip() {
        let config = FilterConfig {
            markup: MarkupStyle::Html,
            ..FilterConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(FilterConfig::from_yaml(&yaml).unwrap(), config);
    }
}
