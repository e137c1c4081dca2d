// Smart Bookmark platform paths
// Where the config file and the local session database live on each OS.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Directory name used on Linux.
pub const APP_DIR: &str = "smart-bookmark";
/// Directory name used on macOS and Windows.
pub const APP_DIR_TITLE: &str = "SmartBookmark";

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `~/.config/smart-bookmark` (or `$XDG_CONFIG_HOME/smart-bookmark`)
/// - **macOS**: `~/Library/Application Support/SmartBookmark`
/// - **Windows**: `%APPDATA%/SmartBookmark`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific data directory (holds `smart-bookmark.db`).
///
/// - **Linux**: `~/.local/share/smart-bookmark` (or `$XDG_DATA_HOME/smart-bookmark`)
/// - **macOS**: `~/Library/Application Support/SmartBookmark`
/// - **Windows**: `%APPDATA%/SmartBookmark`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}
