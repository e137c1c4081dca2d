// Smart Bookmark paths for Linux (XDG base directories)
// Config: ~/.config/smart-bookmark
// Data:   ~/.local/share/smart-bookmark

use std::env;
use std::path::PathBuf;

use super::APP_DIR;

/// `$<xdg_var>/smart-bookmark`, else `$HOME/<fallback...>/smart-bookmark`.
fn resolve(xdg: Option<String>, home: Option<String>, fallback: &[&str]) -> PathBuf {
    let base = match xdg.filter(|v| !v.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => fallback
            .iter()
            .fold(PathBuf::from(home.unwrap_or_else(|| String::from("/tmp"))), |p, s| p.join(s)),
    };
    base.join(APP_DIR)
}

pub fn get_config_dir() -> PathBuf {
    resolve(env::var("XDG_CONFIG_HOME").ok(), env::var("HOME").ok(), &[".config"])
}

pub fn get_data_dir() -> PathBuf {
    resolve(env::var("XDG_DATA_HOME").ok(), env::var("HOME").ok(), &[".local", "share"])
}
