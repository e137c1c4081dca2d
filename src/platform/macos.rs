// Smart Bookmark paths for macOS
// Config and data: ~/Library/Application Support/SmartBookmark

use std::env;
use std::path::PathBuf;

use super::APP_DIR_TITLE;

fn app_support_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
        .join("Library")
        .join("Application Support")
        .join(APP_DIR_TITLE)
}

pub fn get_config_dir() -> PathBuf {
    app_support_dir()
}

pub fn get_data_dir() -> PathBuf {
    app_support_dir()
}
