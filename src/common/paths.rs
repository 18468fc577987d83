//! Configuration and tool paths
//!
//! Linux: `~/.config/basanos/`
//! macOS: `~/Library/Application Support/basanos/`
//! Windows: `%APPDATA%\basanos\`

use std::path::PathBuf;

/// Application name used for platform directories
const APP_NAME: &str = "basanos";

/// Name of the per-directory context declaration
pub const CONTEXT_FILE: &str = "context.yaml";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Directory holding the running executable
///
/// The `assert_*` binaries are installed next to `basanos`, so this
/// directory is searched before `PATH` when resolving assertion commands.
pub fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
}
