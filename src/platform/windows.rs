// Smart Bookmark paths for Windows
// Config and data: %APPDATA%\SmartBookmark

use std::env;
use std::path::PathBuf;

use super::APP_DIR_TITLE;

fn roaming_dir() -> PathBuf {
    match env::var("APPDATA") {
        Ok(appdata) => PathBuf::from(appdata),
        Err(_) => {
            let profile = env::var("USERPROFILE").unwrap_or_else(|_| String::from("C:\\Users\\Default"));
            PathBuf::from(profile).join("AppData").join("Roaming")
        }
    }
}

pub fn get_config_dir() -> PathBuf {
    roaming_dir().join(APP_DIR_TITLE)
}

pub fn get_data_dir() -> PathBuf {
    roaming_dir().join(APP_DIR_TITLE)
}
