//! Repository and entity: generic CRUD over a [`Connection`] with reactive
//! schema repair.
//!
//! The repository is plain composition: it holds the shared connection, a
//! [`TableDef`] describing the desired schema, and a [`Hooks`] set of
//! lifecycle callbacks. Entities are attribute bags; nothing about a
//! concrete record type is baked in.
//!
//! # Schema repair
//!
//! The table definition is the desired schema; the database may lag behind
//! it. Divergence is detected reactively, from the error a query produces,
//! never by proactive comparison. A save that fails on a missing column
//! diffs the definition against the live columns, adds what is missing, and
//! retries the save once. A save that fails on a missing table creates the
//! table from the full definition and takes the same single retry. The
//! retry budget is one per entity instance for its whole life: the attempt
//! counter never resets, so a later schema failure on the same instance is
//! repaired but reported as an error rather than retried.
//!
//! Reads never retry: a fetch against a missing table returns an empty set
//! without creating the table, and a fetch naming a missing column repairs
//! the schema but still comes back empty.

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::types::Value;
use tracing::{debug, info};

use super::connection::{ColumnChange, Connection, DbError, Limit, Row};

// ── Table definition ──────────────────────────────────────────────────────────

/// Desired schema for one table: the name plus an ordered column → SQL-type
/// mapping. `id` is implicit (auto-increment primary key) and must not be
/// declared.
#[derive(Debug, Clone)]
pub struct TableDef {
    name: String,
    columns: Vec<(String, String)>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Append a column. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics on `id`: the primary key is implicit. Definitions are built at
    /// startup, so this fails the process before anything is served.
    pub fn column(mut self, name: &str, ty: &str) -> Self {
        assert!(
            !name.eq_ignore_ascii_case("id"),
            "`id` is implicit and cannot be declared in a table definition",
        );
        self.columns.push((name.to_owned(), ty.to_owned()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }
}

// ── Hooks ─────────────────────────────────────────────────────────────────────

type Hook = Box<dyn Fn(&mut Entity) + Send + Sync>;

/// Lifecycle callbacks, passed to the repository explicitly. All default to
/// no-ops.
///
/// ```rust
/// use plinth::Hooks;
///
/// let hooks = Hooks::new().before_save(|entity| {
///     entity.set("changed", 1_700_000_000_i64);
/// });
/// ```
#[derive(Default)]
pub struct Hooks {
    before_save: Option<Hook>,
    after_save: Option<Hook>,
    before_delete: Option<Hook>,
    after_delete: Option<Hook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_save(mut self, f: impl Fn(&mut Entity) + Send + Sync + 'static) -> Self {
        self.before_save = Some(Box::new(f));
        self
    }

    pub fn after_save(mut self, f: impl Fn(&mut Entity) + Send + Sync + 'static) -> Self {
        self.after_save = Some(Box::new(f));
        self
    }

    pub fn before_delete(mut self, f: impl Fn(&mut Entity) + Send + Sync + 'static) -> Self {
        self.before_delete = Some(Box::new(f));
        self
    }

    pub fn after_delete(mut self, f: impl Fn(&mut Entity) + Send + Sync + 'static) -> Self {
        self.after_delete = Some(Box::new(f));
        self
    }
}

fn run(hook: &Option<Hook>, entity: &mut Entity) {
    if let Some(f) = hook {
        f(entity);
    }
}

// ── Entity ────────────────────────────────────────────────────────────────────

/// A mutable key → value attribute bag representing one table row.
///
/// Constructed empty (transient) or hydrated from a fetched row
/// (persisted). Once the entity holds a non-empty `id`, that key is frozen:
/// further `set("id", …)` calls are silently dropped. Everything else stays
/// writable.
#[derive(Debug, Default)]
pub struct Entity {
    values: Vec<(String, Value)>,
    save_attempts: u32,
}

impl Entity {
    /// A fresh, unsaved entity with an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hydrate from a row fetched out of storage.
    pub(crate) fn from_row(row: Row) -> Self {
        Self {
            values: row,
            save_attempts: 0,
        }
    }

    /// Whether the entity carries a non-empty id.
    pub fn has_id(&self) -> bool {
        match self.get("id") {
            Some(Value::Integer(n)) => *n != 0,
            Some(Value::Text(s)) => !s.is_empty() && s != "0",
            _ => false,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self.get("id") {
            Some(Value::Integer(n)) => Some(*n),
            Some(Value::Text(s)) => s.parse().ok(),
            _ => None,
        }
    }

    /// Set an attribute. Writes to `id` are dropped once an id exists.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        if self.has_id() && key.eq_ignore_ascii_case("id") {
            return self;
        }
        let value = value.into();
        match self.values.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((key.to_owned(), value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The attribute as text, when it is text.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The attribute as an integer, when it is one.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(Value::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// The whole bag, in insertion order.
    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

/// CRUD for one table over the shared connection.
pub struct Repository {
    db: Arc<Connection>,
    table: TableDef,
    hooks: Hooks,
}

impl Repository {
    pub fn new(db: Arc<Connection>, table: TableDef) -> Self {
        Self {
            db,
            table,
            hooks: Hooks::default(),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn table(&self) -> &TableDef {
        &self.table
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn find_by_id(&self, id: i64) -> Result<Option<Entity>, DbError> {
        self.find(Some(&format!("id = {id}")), None)
    }

    /// First matching entity, or `None`.
    pub fn find(
        &self,
        where_clause: Option<&str>,
        order_by: Option<&str>,
    ) -> Result<Option<Entity>, DbError> {
        let mut found = self.find_all(where_clause, order_by, Some(Limit::Count(1)))?;
        Ok(if found.is_empty() { None } else { Some(found.remove(0)) })
    }

    /// Every matching row, each hydrated into a fresh entity.
    pub fn find_all(
        &self,
        where_clause: Option<&str>,
        order_by: Option<&str>,
        limit: Option<Limit>,
    ) -> Result<Vec<Entity>, DbError> {
        let rows = match self
            .db
            .get_rows_where(self.table.name(), where_clause, &[], order_by, limit)
        {
            Ok(rows) => rows,
            Err(DbError::UnknownTable(_)) => {
                // Reads never create the table; that is the writer's move.
                debug!(table = self.table.name(), "fetch against missing table");
                return Ok(Vec::new());
            }
            Err(DbError::UnknownColumn(_)) => {
                self.repair_columns()?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        Ok(rows.into_iter().map(Entity::from_row).collect())
    }

    pub fn count(&self, where_clause: Option<&str>) -> Result<u64, DbError> {
        self.db.get_count_where(self.table.name(), where_clause, &[])
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    /// Insert (transient) or update (persisted) the entity.
    ///
    /// An empty bag is a no-op. A schema mismatch triggers the matching
    /// repair and, the first time for this instance, one retry.
    pub fn save(&self, entity: &mut Entity) -> Result<(), DbError> {
        if entity.is_empty() {
            return Ok(());
        }

        run(&self.hooks.before_save, entity);

        if let Err(e) = self.write(entity) {
            match &e {
                DbError::UnknownColumn(_) => self.repair_columns()?,
                DbError::UnknownTable(_) => self.create_table()?,
                _ => return Err(e),
            }
            entity.save_attempts += 1;
            if entity.save_attempts > 1 {
                // The repair ran, but this instance spent its retry long ago.
                return Err(e);
            }
            self.write(entity)?;
        }

        run(&self.hooks.after_save, entity);
        Ok(())
    }

    /// Delete the backing row. The in-memory entity is left as-is.
    ///
    /// A transient entity has no row, so deleting it is rejected instead of
    /// issuing a by-id statement with no id behind it.
    pub fn delete(&self, entity: &mut Entity) -> Result<(), DbError> {
        if !entity.has_id() {
            return Err(DbError::MissingId);
        }
        let id = entity.id().ok_or(DbError::MissingId)?;

        run(&self.hooks.before_delete, entity);
        self.db.delete_row_by_id(self.table.name(), id)?;
        run(&self.hooks.after_delete, entity);
        Ok(())
    }

    /// Create the table from the full definition.
    pub fn create_table(&self) -> Result<(), DbError> {
        self.db.create_table(self.table.name(), self.table.columns())
    }

    fn write(&self, entity: &mut Entity) -> Result<(), DbError> {
        if entity.has_id() {
            let id = entity.id().ok_or(DbError::MissingId)?;
            let values: Vec<(String, Value)> = entity
                .values()
                .iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case("id"))
                .cloned()
                .collect();
            self.db.update_row_by_id(self.table.name(), &values, id)?;
        } else {
            // A falsy id in the bag marks the entity transient; it must not
            // reach the insert column list.
            let values: Vec<(String, Value)> = entity
                .values()
                .iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case("id"))
                .cloned()
                .collect();
            if values.is_empty() {
                return Ok(());
            }
            let id = self.db.insert_row(self.table.name(), &values)?;
            entity.set("id", id);
        }
        Ok(())
    }

    /// Add every column the definition has and the live table lacks, each
    /// positioned after its immediate predecessor in the definition (the
    /// first one after `id`).
    fn repair_columns(&self) -> Result<(), DbError> {
        let live: HashSet<String> = self
            .db
            .get_fields(self.table.name())?
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        let mut changes = Vec::new();
        let mut prev = "id".to_owned();
        for (name, ty) in self.table.columns() {
            if !live.contains(name) {
                changes.push(ColumnChange {
                    column: name.clone(),
                    ty: ty.clone(),
                    after: Some(prev.clone()),
                });
            }
            prev = name.clone();
        }

        if changes.is_empty() {
            return Ok(());
        }
        info!(
            table = self.table.name(),
            missing = changes.len(),
            "repairing schema",
        );
        self.db.alter_table(self.table.name(), &changes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn users_def() -> TableDef {
        TableDef::new("users")
            .column("firstname", "TEXT")
            .column("lastname", "TEXT")
            .column("email", "TEXT")
    }

    fn repo() -> Repository {
        let db = Arc::new(Connection::open_in_memory().unwrap());
        let repo = Repository::new(db, users_def());
        repo.create_table().unwrap();
        repo
    }

    fn ada() -> Entity {
        let mut e = Entity::new();
        e.set("firstname", "Ada".to_owned())
            .set("lastname", "Lovelace".to_owned())
            .set("email", "ada@example.com".to_owned());
        e
    }

    #[test]
    fn id_becomes_immutable_once_set() {
        let mut e = Entity::new();
        assert!(!e.has_id());
        e.set("id", 5_i64);
        assert!(e.has_id());
        assert_eq!(e.id(), Some(5));
        e.set("id", 99_i64);
        assert_eq!(e.id(), Some(5));
    }

    #[test]
    fn zero_id_stays_transient() {
        let mut e = Entity::new();
        e.set("id", 0_i64);
        assert!(!e.has_id());
        e.set("id", 7_i64);
        assert_eq!(e.id(), Some(7));
    }

    #[test]
    fn save_assigns_a_generated_id() {
        let repo = repo();
        let mut e = ada();
        repo.save(&mut e).unwrap();
        assert!(e.has_id());
        assert_eq!(e.id(), Some(1));
    }

    #[test]
    fn save_on_an_empty_bag_is_a_no_op() {
        let repo = repo();
        let mut e = Entity::new();
        repo.save(&mut e).unwrap();
        assert!(!e.has_id());
        assert_eq!(repo.count(None).unwrap(), 0);
    }

    #[test]
    fn second_save_updates_in_place() {
        let repo = repo();
        let mut e = ada();
        repo.save(&mut e).unwrap();
        let id = e.id().unwrap();

        e.set("email", "countess@example.com".to_owned());
        repo.save(&mut e).unwrap();
        assert_eq!(e.id(), Some(id));
        assert_eq!(repo.count(None).unwrap(), 1);

        let reloaded = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(reloaded.get_str("email"), Some("countess@example.com"));
    }

    #[test]
    fn find_and_find_all_hydrate_entities() {
        let repo = repo();
        repo.save(&mut ada()).unwrap();
        let mut alan = Entity::new();
        alan.set("firstname", "Alan".to_owned())
            .set("lastname", "Turing".to_owned());
        repo.save(&mut alan).unwrap();

        let all = repo.find_all(None, Some("lastname"), None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].get_str("lastname"), Some("Lovelace"));
        assert!(all.iter().all(Entity::has_id));

        let one = repo.find(Some("firstname = 'Alan'"), None).unwrap().unwrap();
        assert_eq!(one.get_str("lastname"), Some("Turing"));
        assert!(repo.find(Some("firstname = 'Nobody'"), None).unwrap().is_none());
        assert!(repo.find_by_id(999).unwrap().is_none());
    }

    #[test]
    fn unknown_column_on_save_repairs_and_retries_once() {
        let db = Arc::new(Connection::open_in_memory().unwrap());
        // Live table lags the definition by two columns.
        db.create_table("users", &[("firstname".to_owned(), "TEXT".to_owned())])
            .unwrap();
        let repo = Repository::new(Arc::clone(&db), users_def());

        let mut e = ada();
        repo.save(&mut e).unwrap();
        assert!(e.has_id());

        // Missing columns were appended in definition order.
        let names: Vec<String> = db
            .get_fields("users")
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["id", "firstname", "lastname", "email"]);
    }

    #[test]
    fn second_schema_failure_on_the_same_instance_is_not_retried() {
        let db = Arc::new(Connection::open_in_memory().unwrap());
        db.create_table("users", &[("firstname".to_owned(), "TEXT".to_owned())])
            .unwrap();
        let repo = Repository::new(Arc::clone(&db), users_def());

        let mut e = ada();
        repo.save(&mut e).unwrap(); // first repair, retry spent

        // Make the schema lag again.
        db.execute("ALTER TABLE \"users\" DROP COLUMN \"email\"", &[]).unwrap();
        e.set("email", "again@example.com".to_owned());
        let err = repo.save(&mut e).unwrap_err();
        assert!(matches!(err, DbError::UnknownColumn(_)));

        // The repair itself still ran, so a fresh instance sails through.
        let mut fresh = ada();
        repo.save(&mut fresh).unwrap();
        assert!(fresh.has_id());
    }

    #[test]
    fn unknown_table_on_save_creates_and_retries() {
        let db = Arc::new(Connection::open_in_memory().unwrap());
        let repo = Repository::new(Arc::clone(&db), users_def());

        let mut e = ada();
        repo.save(&mut e).unwrap();
        assert!(e.has_id());
        assert_eq!(db.get_tables().unwrap(), vec!["users"]);
    }

    #[test]
    fn find_all_against_a_missing_table_returns_empty_without_creating_it() {
        let db = Arc::new(Connection::open_in_memory().unwrap());
        let repo = Repository::new(Arc::clone(&db), users_def());

        assert!(repo.find_all(None, None, None).unwrap().is_empty());
        assert!(db.get_tables().unwrap().is_empty());
    }

    #[test]
    fn deleting_a_transient_entity_is_rejected() {
        let repo = repo();
        let mut e = ada();
        let err = repo.delete(&mut e).unwrap_err();
        assert!(matches!(err, DbError::MissingId));
    }

    #[test]
    fn delete_removes_the_backing_row() {
        let repo = repo();
        let mut e = ada();
        repo.save(&mut e).unwrap();
        assert_eq!(repo.count(None).unwrap(), 1);

        repo.delete(&mut e).unwrap();
        assert_eq!(repo.count(None).unwrap(), 0);
    }

    #[test]
    fn hooks_fire_around_save_and_delete() {
        static DELETES: AtomicUsize = AtomicUsize::new(0);

        let db = Arc::new(Connection::open_in_memory().unwrap());
        let repo = Repository::new(db, users_def()).with_hooks(
            Hooks::new()
                .before_save(|e| {
                    e.set("email", "stamped@example.com".to_owned());
                })
                .after_delete(|_| {
                    DELETES.fetch_add(1, Ordering::SeqCst);
                }),
        );
        repo.create_table().unwrap();

        let mut e = Entity::new();
        e.set("firstname", "Grace".to_owned());
        repo.save(&mut e).unwrap();

        let reloaded = repo.find_by_id(e.id().unwrap()).unwrap().unwrap();
        assert_eq!(reloaded.get_str("email"), Some("stamped@example.com"));

        repo.delete(&mut e).unwrap();
        assert_eq!(DELETES.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "`id` is implicit")]
    fn declaring_id_in_a_definition_panics() {
        let _ = TableDef::new("users").column("id", "INTEGER");
    }
}
