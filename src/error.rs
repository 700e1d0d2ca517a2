//! Unified error type.

use std::path::PathBuf;

use crate::db::DbError;

/// The error type returned by plinth's fallible operations.
///
/// Route misses are not errors. A path that matches nothing is a normal
/// dispatch outcome and renders as a 404 page; this type covers the
/// failures underneath: the database, the filesystem, configuration, and
/// controller resolution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config `{}`: {source}", path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("template `{name}`: {source}")]
    Template {
        name: String,
        source: std::io::Error,
    },

    #[error("no controller registered as `{0}`")]
    UnknownController(String),

    #[error("controller `{controller}` has no action `{action}`")]
    UnknownAction { controller: String, action: String },
}
