//! SQLite connection: parameterized execution plus schema primitives.
//!
//! One handle, opened once, shared behind a mutex for the life of the
//! process. Everything here builds SQL strings and runs them; nothing here
//! classifies beyond tagging the two schema error kinds, and nothing here
//! recovers. Recovery is the repository's job.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::{debug, info};

/// One fetched row: column name → scalar, in result-set order.
pub type Row = Vec<(String, Value)>;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Database failure, with the two schema-mismatch kinds split out so the
/// repository can branch on them explicitly.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// A by-id operation on an entity that has no id.
    #[error("entity has no id")]
    MissingId,

    #[error("database: {0}")]
    Other(rusqlite::Error),
}

/// Classification happens here and nowhere else. SQLite reports schema
/// misses in the error text: `no such table: t` and `no such column: c` on
/// reads, `table t has no column named c` on writes.
impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(_, Some(msg)) = &e {
            if let Some(table) = msg.strip_prefix("no such table: ") {
                return Self::UnknownTable(table.to_owned());
            }
            if let Some(column) = msg.strip_prefix("no such column: ") {
                return Self::UnknownColumn(column.to_owned());
            }
            if let Some(pos) = msg.find(" has no column named ") {
                return Self::UnknownColumn(msg[pos + " has no column named ".len()..].to_owned());
            }
        }
        Self::Other(e)
    }
}

// ── Builder inputs ────────────────────────────────────────────────────────────

/// A `LIMIT` clause: a plain row count, or an (offset, count) pair rendered
/// as `offset,count`.
#[derive(Debug, Clone, Copy)]
pub enum Limit {
    Count(u64),
    OffsetCount(u64, u64),
}

impl Limit {
    fn to_sql(self) -> String {
        match self {
            Self::Count(n) => n.to_string(),
            Self::OffsetCount(offset, count) => format!("{offset},{count}"),
        }
    }
}

/// One planned column addition. `after` records the intended predecessor
/// from the table definition; SQLite always appends, so the field is kept
/// for the log and the relative ordering is preserved by applying changes
/// in plan order.
#[derive(Debug, Clone)]
pub struct ColumnChange {
    pub column: String,
    pub ty: String,
    pub after: Option<String>,
}

// ── Connection ────────────────────────────────────────────────────────────────

/// Wraps a single SQLite handle.
pub struct Connection {
    inner: Mutex<rusqlite::Connection>,
}

impl Connection {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = rusqlite::Connection::open(path)?;
        Ok(Self { inner: Mutex::new(conn) })
    }

    /// A private in-memory database, mostly for tests and demos.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Ok(Self { inner: Mutex::new(conn) })
    }

    fn lock(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Run `sql`, binding `params` positionally, and collect every row.
    pub fn query_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        debug!(%sql, "query");
        let conn = self.lock();
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|&n| n.to_owned()).collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Row::with_capacity(names.len());
            for (idx, name) in names.iter().enumerate() {
                values.push((name.clone(), row.get::<_, Value>(idx)?));
            }
            out.push(values);
        }
        Ok(out)
    }

    /// Run a statement, binding `params` positionally. Returns the number of
    /// affected rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, DbError> {
        debug!(%sql, "execute");
        let conn = self.lock();
        Ok(conn.execute(sql, params_from_iter(params.iter()))?)
    }

    // ── SELECT builders ───────────────────────────────────────────────────────

    /// `SELECT * FROM table [WHERE …] [ORDER BY …] [LIMIT …]`.
    ///
    /// `where_clause` and `order_by` are raw SQL fragments supplied by the
    /// caller; values referenced with `?` bind from `params`.
    pub fn get_rows_where(
        &self,
        table: &str,
        where_clause: Option<&str>,
        params: &[Value],
        order_by: Option<&str>,
        limit: Option<Limit>,
    ) -> Result<Vec<Row>, DbError> {
        let sql = select_sql(table, "*", where_clause, order_by, limit);
        self.query_rows(&sql, params)
    }

    /// First matching row, or `None`.
    pub fn get_row_where(
        &self,
        table: &str,
        where_clause: Option<&str>,
        params: &[Value],
        order_by: Option<&str>,
    ) -> Result<Option<Row>, DbError> {
        let rows =
            self.get_rows_where(table, where_clause, params, order_by, Some(Limit::Count(1)))?;
        Ok(rows.into_iter().next())
    }

    /// `SELECT COUNT(*) FROM table [WHERE …]`.
    pub fn get_count_where(
        &self,
        table: &str,
        where_clause: Option<&str>,
        params: &[Value],
    ) -> Result<u64, DbError> {
        let sql = select_sql(table, "COUNT(*)", where_clause, None, None);
        let rows = self.query_rows(&sql, params)?;
        match rows.first().and_then(|row| row.first()) {
            Some((_, Value::Integer(n))) => Ok(u64::try_from(*n).unwrap_or(0)),
            _ => Ok(0),
        }
    }

    // ── Write builders ────────────────────────────────────────────────────────

    /// `INSERT INTO table (cols…) VALUES (?…)`, every value bound. Returns
    /// the generated row id.
    ///
    /// Held under one lock so the id read cannot interleave with another
    /// insert on the shared handle.
    pub fn insert_row(&self, table: &str, values: &[(String, Value)]) -> Result<i64, DbError> {
        let columns: Vec<String> = values.iter().map(|(name, _)| quote_ident(name)).collect();
        let marks = vec!["?"; values.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns.join(", "),
            marks,
        );
        debug!(%sql, "execute");
        let conn = self.lock();
        conn.execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;
        Ok(conn.last_insert_rowid())
    }

    /// `UPDATE table SET col = ?, … WHERE …`. A no-op for an empty value set.
    pub fn update_rows_where(
        &self,
        table: &str,
        values: &[(String, Value)],
        where_clause: &str,
    ) -> Result<usize, DbError> {
        if values.is_empty() {
            return Ok(0);
        }
        let assignments: Vec<String> = values
            .iter()
            .map(|(name, _)| format!("{} = ?", quote_ident(name)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quote_ident(table),
            assignments.join(", "),
            where_clause,
        );
        let params: Vec<Value> = values.iter().map(|(_, v)| v.clone()).collect();
        self.execute(&sql, &params)
    }

    pub fn update_row_by_id(
        &self,
        table: &str,
        values: &[(String, Value)],
        id: i64,
    ) -> Result<usize, DbError> {
        self.update_rows_where(table, values, &format!("id = {id}"))
    }

    pub fn delete_rows_where(&self, table: &str, where_clause: &str) -> Result<usize, DbError> {
        let sql = format!("DELETE FROM {} WHERE {}", quote_ident(table), where_clause);
        self.execute(&sql, &[])
    }

    pub fn delete_row_by_id(&self, table: &str, id: i64) -> Result<usize, DbError> {
        self.delete_rows_where(table, &format!("id = {id}"))
    }

    // ── Schema primitives ─────────────────────────────────────────────────────

    /// `CREATE TABLE IF NOT EXISTS` from an ordered column → type mapping.
    /// `id INTEGER PRIMARY KEY AUTOINCREMENT` is implicit and comes first.
    pub fn create_table(&self, table: &str, columns: &[(String, String)]) -> Result<(), DbError> {
        let mut defs = Vec::with_capacity(columns.len() + 1);
        defs.push(format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident("id")));
        for (name, ty) in columns {
            defs.push(format!("{} {}", quote_ident(name), ty));
        }
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(table),
            defs.join(", "),
        );
        info!(%table, "creating table");
        self.execute(&sql, &[])?;
        Ok(())
    }

    /// Apply an ordered list of column additions.
    ///
    /// SQLite takes one `ADD COLUMN` per statement and appends at the end of
    /// the row, so the plan runs as a statement sequence; applying it in
    /// plan order keeps the new columns in their intended relative order.
    pub fn alter_table(&self, table: &str, changes: &[ColumnChange]) -> Result<(), DbError> {
        for change in changes {
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                quote_ident(table),
                quote_ident(&change.column),
                change.ty,
            );
            info!(
                %table,
                column = %change.column,
                after = change.after.as_deref().unwrap_or("-"),
                "adding column",
            );
            self.execute(&sql, &[])?;
        }
        Ok(())
    }

    /// Ordered (name, declared type) pairs for a table's live columns.
    /// A table that does not exist yields an empty list.
    pub fn get_fields(&self, table: &str) -> Result<Vec<(String, String)>, DbError> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let rows = self.query_rows(&sql, &[])?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let mut name = None;
                let mut ty = None;
                for (col, value) in row {
                    match (col.as_str(), value) {
                        ("name", Value::Text(v)) => name = Some(v),
                        ("type", Value::Text(v)) => ty = Some(v),
                        _ => {}
                    }
                }
                Some((name?, ty.unwrap_or_default()))
            })
            .collect())
    }

    /// Names of every user table in the database.
    pub fn get_tables(&self) -> Result<Vec<String>, DbError> {
        let rows = self.query_rows(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some((_, Value::Text(name))) => Some(name),
                _ => None,
            })
            .collect())
    }
}

fn select_sql(
    table: &str,
    projection: &str,
    where_clause: Option<&str>,
    order_by: Option<&str>,
    limit: Option<Limit>,
) -> String {
    let mut sql = format!("SELECT {projection} FROM {}", quote_ident(table));
    if let Some(clause) = where_clause {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
    if let Some(order) = order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ");
        sql.push_str(&limit.to_sql());
    }
    sql
}

/// Double-quote an identifier, doubling embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
