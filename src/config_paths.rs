//! Configuration paths for fencedfilter
//!
//! All config files live under:
//! - Unix/macOS: `~/.config/fencedfilter/`
//! - Windows: `%APPDATA%\fencedfilter\`

use std::{
    env, fs,
    path::{Path, PathBuf},
};

const APP_DIR: &str = "fencedfilter";

/// Base config directory for fencedfilter
///
/// Unix/macOS:
///   - If XDG_CONFIG_HOME is set: `$XDG_CONFIG_HOME/fencedfilter`
///   - Else: `~/.config/fencedfilter`
///
/// Windows:
///   - `%APPDATA%\fencedfilter`
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_DIR))
    }

    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|config| config.join(APP_DIR))
    }
}

/// `~/.config/fencedfilter/config.yaml`
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// `~/.config/fencedfilter/rules/`, searched for `<language>.hl`
pub fn rules_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("rules"))
}

/// `~/.config/fencedfilter/logs/`
pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("logs"))
}

fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path)
        .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))
}

/// Ensure logs dir exists, returning it
pub fn ensure_logs_dir() -> Result<PathBuf, String> {
    let logs = logs_dir().ok_or_else(|| "No config directory available".to_string())?;
    ensure_dir(&logs)?;
    Ok(logs)
}
