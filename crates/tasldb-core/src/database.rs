//! The database handle.
//!
//! Binds the compiled table layouts to a rusqlite connection: lifecycle,
//! point access, ordered iteration, and writes. Statement text comes from
//! the layouts and is prepared through the connection's statement cache, so
//! each class's statements are compiled once per handle.

use std::path::{Path, PathBuf};

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info};

use tasldb_error::{Result, TaslError};
use tasldb_relational::{assemble, compile_schema, shred, Cell, TableLayout};
use tasldb_types::varint::MAX_SAFE_ID;
use tasldb_types::{decode_schema, encode_schema, Schema, Type, Value};

/// Well-known row id of the persisted schema blob.
const SCHEMA_ROW_ID: i64 = 0;

const CREATE_SCHEMAS_SQL: &str =
    "CREATE TABLE \"schemas\" (\"id\" INTEGER PRIMARY KEY, \"value\" BLOB NOT NULL)";
const INSERT_SCHEMA_SQL: &str = "INSERT INTO \"schemas\" (\"id\", \"value\") VALUES (?1, ?2)";
const SELECT_SCHEMA_SQL: &str = "SELECT \"value\" FROM \"schemas\" WHERE \"id\" = ?1";

/// Options for [`Database::open`].
#[derive(Clone, Debug, Default)]
pub struct OpenOptions {
    /// Open the file read-only; writes fail with a storage error.
    pub read_only: bool,
    /// Expected schema, compared structurally against the persisted blob.
    pub schema: Option<Schema>,
}

/// An `(id, value)` pair, the unit of [`Database::merge`].
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub id: u64,
    pub value: Value,
}

/// An embedded, schema-typed database of tasl elements.
///
/// The schema is fixed at creation; elements are only ever added. A handle
/// owns its connection and cached statements exclusively, and no two
/// operations on it run concurrently.
pub struct Database {
    pub(crate) conn: Connection,
    schema: Schema,
    pub(crate) layouts: Vec<TableLayout>,
    read_only: bool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("classes", &self.schema.len())
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Create a fresh database at `path` (in-memory when `None`) with the
    /// given schema, persisting the schema blob and every class table.
    pub fn create(path: Option<&Path>, schema: Schema) -> Result<Self> {
        let conn = match path {
            None => Connection::open_in_memory()?,
            Some(p) => Connection::open(p)?,
        };
        conn.pragma_update(None, "foreign_keys", true)?;
        let layouts = compile_schema(&schema);
        let tx = conn.unchecked_transaction()?;
        tx.execute(CREATE_SCHEMAS_SQL, [])?;
        tx.execute(
            INSERT_SCHEMA_SQL,
            params![SCHEMA_ROW_ID, encode_schema(&schema)],
        )?;
        for layout in &layouts {
            tx.execute(&layout.create_table_sql(), [])?;
        }
        tx.commit()?;
        info!(classes = layouts.len(), path = ?path, "created database");
        Ok(Self {
            conn,
            schema,
            layouts,
            read_only: false,
        })
    }

    /// Open an existing database file, decoding its persisted schema.
    pub fn open(path: &Path, options: OpenOptions) -> Result<Self> {
        if !path.exists() {
            return Err(TaslError::DatabaseNotFound {
                path: PathBuf::from(path),
            });
        }
        let flags = if options.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        let conn = Connection::open_with_flags(path, flags)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let blob: Vec<u8> =
            conn.query_row(SELECT_SCHEMA_SQL, params![SCHEMA_ROW_ID], |row| row.get(0))?;
        let schema = decode_schema(&blob)?;
        if let Some(expected) = &options.schema {
            if *expected != schema {
                return Err(TaslError::schema_mismatch(
                    "persisted schema does not match the expected schema",
                ));
            }
        }
        let layouts = compile_schema(&schema);
        debug!(classes = layouts.len(), path = ?path, "opened database");
        Ok(Self {
            conn,
            schema,
            layouts,
            read_only: options.read_only,
        })
    }

    /// Finalize cached statements and close the connection.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }

    /// The schema this database was created with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn layout(&self, key: &str) -> Result<&TableLayout> {
        self.schema
            .index_of(key)
            .map(|index| &self.layouts[index])
            .ok_or_else(|| TaslError::no_class(key))
    }

    fn class_type(&self, key: &str) -> Result<&Type> {
        self.schema.get(key).ok_or_else(|| TaslError::no_class(key))
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(TaslError::ReadOnly);
        }
        Ok(())
    }

    // ── Point access ─────────────────────────────────────────────────────

    /// Fetch and reassemble the element `id` of class `key`.
    pub fn get(&self, key: &str, id: u64) -> Result<Value> {
        let layout = self.layout(key)?;
        let ty = self.class_type(key)?;
        let Ok(row_id) = i64::try_from(id) else {
            return Err(TaslError::no_element(key, id));
        };
        let width = layout.columns.len();
        let mut stmt = self.conn.prepare_cached(&layout.select_sql)?;
        let cells: Option<Vec<Cell>> = stmt
            .query_row(params![row_id], |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i).map(sql_to_cell))
                    .collect()
            })
            .optional()?;
        match cells {
            Some(cells) => assemble(layout, ty, &cells),
            None => Err(TaslError::no_element(key, id)),
        }
    }

    /// True when class `key` holds an element with `id`.
    pub fn has(&self, key: &str, id: u64) -> Result<bool> {
        let layout = self.layout(key)?;
        let Ok(row_id) = i64::try_from(id) else {
            return Ok(false);
        };
        let mut stmt = self.conn.prepare_cached(&layout.has_sql)?;
        Ok(stmt.exists(params![row_id])?)
    }

    /// Number of elements in class `key`.
    pub fn count(&self, key: &str) -> Result<u64> {
        let layout = self.layout(key)?;
        let mut stmt = self.conn.prepare_cached(&layout.count_sql)?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ── Iteration ────────────────────────────────────────────────────────

    pub(crate) fn ids(&self, key: &str) -> Result<Vec<u64>> {
        let layout = self.layout(key)?;
        let mut stmt = self.conn.prepare_cached(&layout.keys_sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|r| r.map(|id| id as u64))
            .collect::<rusqlite::Result<Vec<u64>>>()?;
        Ok(ids)
    }

    /// Ids of class `key` in ascending order.
    pub fn keys(&self, key: &str) -> Result<impl Iterator<Item = u64>> {
        Ok(self.ids(key)?.into_iter())
    }

    /// `(id, value)` pairs of class `key`, ascending by id. Values are
    /// fetched lazily as the iterator advances.
    pub fn entries(&self, key: &str) -> Result<Entries<'_>> {
        let ids = self.ids(key)?;
        Ok(Entries {
            db: self,
            class: key.to_owned(),
            ids: ids.into_iter(),
        })
    }

    /// Values of class `key`, ascending by id.
    pub fn values(&self, key: &str) -> Result<Values<'_>> {
        Ok(Values(self.entries(key)?))
    }

    // ── Writes ───────────────────────────────────────────────────────────

    /// Insert or replace the element `id` of class `key`.
    pub fn set(&self, key: &str, id: u64, value: &Value) -> Result<()> {
        self.check_writable()?;
        if id > MAX_SAFE_ID {
            return Err(TaslError::IdOutOfRange { id });
        }
        let layout = self.layout(key)?;
        let ty = self.class_type(key)?;
        let row = shred(layout, ty, value)?;
        self.upsert_row(layout, id, &row)
    }

    pub(crate) fn upsert_row(&self, layout: &TableLayout, id: u64, row: &[Cell]) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(&layout.upsert_sql)?;
        let mut bindings = Vec::with_capacity(row.len() + 1);
        bindings.push(SqlValue::Integer(id as i64));
        bindings.extend(row.iter().map(cell_to_sql));
        stmt.execute(params_from_iter(bindings))?;
        Ok(())
    }

    /// Append a new element to class `key`, returning its assigned id.
    ///
    /// The id comes from the table's auto-increment sequence and is strictly
    /// greater than any id previously used in the class.
    pub fn push(&self, key: &str, value: &Value) -> Result<u64> {
        self.check_writable()?;
        let layout = self.layout(key)?;
        let ty = self.class_type(key)?;
        let row = shred(layout, ty, value)?;
        let mut stmt = self.conn.prepare_cached(&layout.insert_sql)?;
        let bindings: Vec<SqlValue> = row.iter().map(cell_to_sql).collect();
        let id: Option<i64> = stmt
            .query_row(params_from_iter(bindings), |row| row.get(0))
            .optional()?;
        let id = id.ok_or(TaslError::NoRowReturned)?;
        Ok(id as u64)
    }

    /// Write elements across classes in one atomic transaction.
    ///
    /// Foreign-key checks are deferred to commit, so elements inside the
    /// call may reference each other regardless of insertion order; a
    /// violation at commit rolls back every element, and enforcement is
    /// restored either way.
    pub fn merge(&self, elements: &[(String, Vec<Element>)]) -> Result<()> {
        self.check_writable()?;
        let total: usize = elements.iter().map(|(_, e)| e.len()).sum();
        debug!(classes = elements.len(), elements = total, "merge");
        let tx = self.conn.unchecked_transaction()?;
        tx.pragma_update(None, "defer_foreign_keys", true)?;
        for (key, class_elements) in elements {
            let layout = self.layout(key)?;
            let ty = self.class_type(key)?;
            for element in class_elements {
                if element.id > MAX_SAFE_ID {
                    return Err(TaslError::IdOutOfRange { id: element.id });
                }
                let row = shred(layout, ty, &element.value)?;
                self.upsert_row(layout, element.id, &row)?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

/// Ordered `(id, value)` iterator over one class.
///
/// Ids are snapshotted up front; each value is fetched on demand, so
/// dropping the iterator abandons no open cursor.
pub struct Entries<'db> {
    db: &'db Database,
    class: String,
    ids: std::vec::IntoIter<u64>,
}

impl Iterator for Entries<'_> {
    type Item = Result<(u64, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        Some(self.db.get(&self.class, id).map(|value| (id, value)))
    }
}

/// Ordered value iterator over one class.
pub struct Values<'db>(Entries<'db>);

impl Iterator for Values<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.0.next()?.map(|(_, value)| value))
    }
}

pub(crate) fn cell_to_sql(cell: &Cell) -> SqlValue {
    match cell {
        Cell::Null => SqlValue::Null,
        Cell::Integer(v) => SqlValue::Integer(*v),
        Cell::Real(v) => SqlValue::Real(*v),
        Cell::Text(s) => SqlValue::Text(s.clone()),
        Cell::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

pub(crate) fn sql_to_cell(value: SqlValue) -> Cell {
    match value {
        SqlValue::Null => Cell::Null,
        SqlValue::Integer(v) => Cell::Integer(v),
        SqlValue::Real(v) => Cell::Real(v),
        SqlValue::Text(s) => Cell::Text(s),
        SqlValue::Blob(b) => Cell::Blob(b),
    }
}
