//! SQLite as the engine under test, through `rusqlite`.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use sqlmorph_error::{MorphError, Result};
use sqlmorph_gen::{Dialect, Sqlite};
use sqlmorph_oracle::{Cell, ExecutionError, Executor, ResultSet, Row};
use sqlmorph_types::{ColumnDef, Schema, Table};
use tracing::debug;

use crate::campaign::SchemaProvider;

fn introspection_error(err: rusqlite::Error) -> MorphError {
    MorphError::Introspection(err.to_string())
}

fn cell(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(v) => Cell::Integer(v),
        ValueRef::Real(v) => Cell::Real(v),
        ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Cell::Blob(bytes.to_vec()),
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Read the schema of `conn`: user tables and views with their columns,
/// primary keys, NOT NULL constraints and index names.
pub fn introspect(conn: &Connection) -> Result<Schema> {
    let dialect = Sqlite;
    let mut objects = conn
        .prepare(
            "SELECT name, type FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .map_err(introspection_error)?;
    let names: Vec<(String, String)> = objects
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(introspection_error)?
        .collect::<rusqlite::Result<_>>()
        .map_err(introspection_error)?;

    let mut tables = Vec::with_capacity(names.len());
    for (name, kind) in names {
        let mut info = conn
            .prepare(&format!("PRAGMA table_info({})", quote(&name)))
            .map_err(introspection_error)?;
        let columns: Vec<(String, String, bool, i64)> = info
            .query_map([], |row| Ok((row.get(1)?, row.get(2)?, row.get(3)?, row.get(5)?)))
            .map_err(introspection_error)?
            .collect::<rusqlite::Result<_>>()
            .map_err(introspection_error)?;
        let mut defs = Vec::with_capacity(columns.len());
        for (column, declared, not_null, pk) in columns {
            let ty = dialect.parse_type_name(&declared).ok_or_else(|| MorphError::SchemaLookup {
                kind: "type",
                name: declared.clone(),
            })?;
            let mut def = ColumnDef::new(column, ty);
            if pk > 0 {
                def = def.primary_key();
            }
            if not_null {
                def = def.not_null();
            }
            defs.push(def);
        }

        let mut index_list = conn
            .prepare(&format!("PRAGMA index_list({})", quote(&name)))
            .map_err(introspection_error)?;
        let listed: Vec<(String, String)> = index_list
            .query_map([], |row| Ok((row.get(1)?, row.get(3)?)))
            .map_err(introspection_error)?
            .collect::<rusqlite::Result<_>>()
            .map_err(introspection_error)?;
        // Only indexes from CREATE INDEX ("c"); constraint autoindexes are
        // not nameable.
        let indexes: Vec<String> = listed
            .into_iter()
            .filter(|(_, origin)| origin == "c")
            .map(|(index, _)| index)
            .collect();

        debug!(table = %name, columns = defs.len(), indexes = indexes.len(), "introspected");
        tables.push(Table::new(name, defs, indexes, kind == "view"));
    }
    Ok(Schema::new(tables))
}

/// One SQLite session.
#[derive(Debug)]
pub struct SqliteExecutor {
    conn: Connection,
}

impl SqliteExecutor {
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open_in_memory() -> Result<Self> {
        Connection::open_in_memory()
            .map(Self::new)
            .map_err(|err| MorphError::internal(format!("cannot open in-memory database: {err}")))
    }

    pub fn open(path: &Path) -> Result<Self> {
        Connection::open(path)
            .map(Self::new)
            .map_err(|err| MorphError::internal(format!("cannot open {}: {err}", path.display())))
    }

    /// Run setup statements (DDL, inserts) outside of any oracle.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|err| MorphError::unexpected_execution(sql, err.to_string()))
    }

    pub fn schema(&self) -> Result<Schema> {
        introspect(&self.conn)
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Executor for SqliteExecutor {
    fn execute(&mut self, sql: &str) -> std::result::Result<ResultSet, ExecutionError> {
        let to_error = |err: rusqlite::Error| ExecutionError::new(err.to_string());
        let mut stmt = self.conn.prepare(sql).map_err(to_error)?;
        let width = stmt.column_count();
        let mut rows = stmt.query([]).map_err(to_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(to_error)? {
            let mut values: Row = Vec::with_capacity(width);
            for i in 0..width {
                values.push(cell(row.get_ref(i).map_err(to_error)?));
            }
            out.push(values);
        }
        Ok(ResultSet::new(out))
    }
}

/// Serves fresh snapshots from a dedicated connection.
#[derive(Debug)]
pub struct SqliteSchemaProvider {
    conn: Mutex<Connection>,
}

impl SqliteSchemaProvider {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Connection::open(path)
            .map(Self::new)
            .map_err(|err| MorphError::internal(format!("cannot open {}: {err}", path.display())))
    }
}

impl SchemaProvider for SqliteSchemaProvider {
    fn snapshot(&self) -> Result<Schema> {
        introspect(&self.conn.lock())
    }
}

#[cfg(test)]
mod tests {
    use sqlmorph_types::DataType;

    use super::*;

    fn executor() -> SqliteExecutor {
        let exec = SqliteExecutor::open_in_memory().unwrap();
        exec.execute_batch(
            "CREATE TABLE t0 (c0 INT PRIMARY KEY, c1 TEXT NOT NULL, c2 REAL, c3 BLOB);
             CREATE INDEX i0 ON t0 (c1);
             CREATE VIEW v0 AS SELECT c0 FROM t0;
             INSERT INTO t0 VALUES (1, 'a', 0.5, X'00ff'), (2, 'b', NULL, NULL);",
        )
        .unwrap();
        exec
    }

    #[test]
    fn introspection_reads_tables_views_and_indexes() {
        let schema = executor().schema().unwrap();
        let names: Vec<&str> = schema.tables().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["t0", "v0"]);

        let t0 = schema.table("t0").unwrap();
        assert!(!t0.is_view());
        assert!(t0.has_primary_key());
        assert_eq!(t0.indexes(), ["i0".to_owned()]);
        let c1 = t0.column("c1").unwrap();
        assert_eq!(c1.data_type(), DataType::Text);
        assert!(!c1.is_nullable());
        assert_eq!(t0.column("c2").unwrap().data_type(), DataType::Float);
        assert_eq!(t0.column("c3").unwrap().data_type(), DataType::Blob);

        assert!(schema.table("v0").unwrap().is_view());
    }

    #[test]
    fn execution_maps_every_storage_class() {
        let mut exec = executor();
        let result = exec.execute("SELECT c0, c1, c2, c3 FROM t0 ORDER BY c0").unwrap();
        assert_eq!(
            result.rows,
            vec![
                vec![
                    Cell::Integer(1),
                    Cell::Text("a".into()),
                    Cell::Real(0.5),
                    Cell::Blob(vec![0x00, 0xff]),
                ],
                vec![Cell::Integer(2), Cell::Text("b".into()), Cell::Null, Cell::Null],
            ]
        );
    }

    #[test]
    fn blobs_never_equal_their_text_spelling() {
        let mut exec = executor();
        let result = exec.execute("SELECT X'00ff', 'x''00ff'''").unwrap();
        let row = &result.rows[0];
        assert_eq!(row[0], Cell::Blob(vec![0x00, 0xff]));
        assert_eq!(row[1], Cell::Text("x'00ff'".into()));
        assert!(!sqlmorph_oracle::compare::values_equal_approx(&row[0], &row[1]));
    }

    #[test]
    fn engine_errors_keep_the_message() {
        let mut exec = executor();
        let err = exec.execute("SELECT nope FROM t0").unwrap_err();
        assert!(err.message.contains("no such column"), "{err}");
    }

    #[test]
    fn provider_snapshots_from_its_connection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE a (x INT); CREATE TABLE b (y TEXT);")
            .unwrap();
        let provider = SqliteSchemaProvider::new(conn);
        let schema = provider.snapshot().unwrap();
        assert_eq!(schema.tables().len(), 2);
    }
}
