//! Command line and configuration.
//!
//! Settings come from a JSON file, overlaid by environment variables (a
//! `.env` file is honoured). The Next.js-style `NEXT_PUBLIC_SUPABASE_*`
//! names are accepted as fallbacks so an existing web project's `.env` works.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::managers::session_store::DEFAULT_PROVIDER;
use crate::platform;
use crate::services::oauth_callback::DEFAULT_CALLBACK_PORT;
use crate::services::table_client::DEFAULT_TABLE;
use crate::services::token_store::DEFAULT_SESSION_PASSPHRASE;
use crate::types::errors::ConfigError;

/// File name of the local session database inside the data directory.
pub const DATABASE_FILE: &str = "smart-bookmark.db";

#[derive(Parser, Debug)]
#[command(name = "smart-bookmark", version)]
#[command(about = "Save, list and delete bookmarks in your Supabase project", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive console (default)
    Shell,
    /// Sign in through the OAuth provider
    Login,
    /// Sign out and forget the stored session
    Logout,
    /// Print the signed-in user
    Whoami,
    /// Print your bookmarks, newest first
    List,
    /// Save a bookmark
    Add {
        url: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Delete a bookmark by id
    Delete { id: String },
    /// Console against an in-memory backend, no project needed
    Demo,
}

pub fn default_config_path() -> PathBuf {
    platform::get_config_dir().join("config.json")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub oauth_provider: String,
    pub callback_port: u16,
    pub bookmarks_table: String,
    pub data_dir: Option<PathBuf>,
    /// Secret the stored session is sealed with; kept out of the database.
    pub session_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            oauth_provider: DEFAULT_PROVIDER.to_string(),
            callback_port: DEFAULT_CALLBACK_PORT,
            bookmarks_table: DEFAULT_TABLE.to_string(),
            data_dir: None,
            session_key: None,
        }
    }
}

/// First non-empty value among `keys`.
fn first_set(env: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| env(key).filter(|v| !v.is_empty()))
}

impl AppConfig {
    /// Loads `.env`, then the config file, then the process environment.
    ///
    /// A missing file is fine unless `path` was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }

        let file = match path {
            Some(path) => Some(Self::read_file(path)?),
            None => {
                let path = default_config_path();
                if path.exists() {
                    Some(Self::read_file(&path)?)
                } else {
                    None
                }
            }
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Overlays environment values from `env` onto `file` (or the defaults).
    pub fn from_sources(file: Option<Self>, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = file.unwrap_or_default();

        if let Some(url) = first_set(&env, &["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]) {
            config.supabase_url = url;
        }
        if let Some(key) = first_set(&env, &["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"]) {
            config.supabase_anon_key = key;
        }
        if let Some(provider) = first_set(&env, &["SMART_BOOKMARK_PROVIDER"]) {
            config.oauth_provider = provider;
        }
        if let Some(port) = first_set(&env, &["SMART_BOOKMARK_CALLBACK_PORT"]) {
            config.callback_port = port.parse().map_err(|_| ConfigError::Invalid {
                key: "callback_port",
                message: format!("'{}' is not a port number", port),
            })?;
        }
        if let Some(dir) = first_set(&env, &["SMART_BOOKMARK_DATA_DIR"]) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(table) = first_set(&env, &["SMART_BOOKMARK_TABLE"]) {
            config.bookmarks_table = table;
        }
        if let Some(key) = first_set(&env, &["SMART_BOOKMARK_SESSION_KEY"]) {
            config.session_key = Some(key);
        }

        Ok(config)
    }

    /// Checks the settings needed to reach a hosted project.
    pub fn validate_remote(&self) -> Result<(), ConfigError> {
        if self.supabase_url.is_empty() {
            return Err(ConfigError::Missing("supabase_url"));
        }
        if self.supabase_anon_key.is_empty() {
            return Err(ConfigError::Missing("supabase_anon_key"));
        }
        if self.oauth_provider.is_empty() {
            return Err(ConfigError::Missing("oauth_provider"));
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(platform::get_data_dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(DATABASE_FILE)
    }

    /// Passphrase for the local session store.
    pub fn session_passphrase(&self) -> &str {
        self.session_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .unwrap_or(DEFAULT_SESSION_PASSPHRASE)
    }
}
