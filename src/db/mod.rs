//! Persistence: one SQLite handle, a hand-rolled SQL builder, and a
//! repository with reactive schema repair.
//!
//! [`Connection`] executes parameterized SQL and exposes the schema
//! primitives (create, alter, introspect). [`Repository`] layers
//! find/save/delete on top of it for one table, owns the lifecycle hooks,
//! and repairs the schema when a write trips over a missing column or
//! table. Neither half knows about HTTP.

mod connection;
mod record;

pub use connection::{ColumnChange, Connection, DbError, Limit, Row};
pub use record::{Entity, Hooks, Repository, TableDef};

/// The scalar stored in a row cell and in an [`Entity`]'s attribute bag.
pub use rusqlite::types::Value;
