//! Application configuration, loaded from a TOML file.
//!
//! Every field has a default, so a partial file is fine and so is no file
//! at all (`AppConfig::default()`):
//!
//! ```toml
//! [server]
//! addr = "0.0.0.0:3000"
//!
//! [database]
//! path = "app.sqlite3"
//!
//! [views]
//! dir = "templates"
//! layout = "layouts/main.html"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub views: ViewConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. `:memory:` is accepted.
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    /// Root directory templates are resolved against.
    #[serde(default = "default_views_dir")]
    pub dir: PathBuf,
    /// Layout template, relative to `dir`. `None` disables the layout pass.
    #[serde(default = "default_layout")]
    pub layout: Option<String>,
}

impl AppConfig {
    /// Load and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { addr: default_addr() }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            dir: default_views_dir(),
            layout: default_layout(),
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:3000".to_owned()
}

fn default_db_path() -> String {
    "app.sqlite3".to_owned()
}

fn default_views_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_layout() -> Option<String> {
    Some("layouts/main.html".to_owned())
}
