//! SQLite schema introspection and candidate query execution.
//!
//! The evaluator treats the database as an oracle: a candidate is handed to
//! SQLite verbatim and the outcome (success, rows, error text) feeds the
//! reward heuristic. Nothing here sandboxes or restricts statement types;
//! a candidate containing DDL/DML really runs. That hazard is part of the
//! evaluation contract, not something this layer papers over.
//!
//! File-backed databases open a fresh connection per execution call so that
//! independent questions can run concurrently without sharing a handle.
//! In-memory mode keeps one mutex-guarded connection instead, since every
//! fresh `:memory:` connection would otherwise see an empty database; it is
//! meant for tests and demos.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ScoutError};

/// Where the database lives.
#[derive(Debug, Clone)]
pub enum DatabaseMode {
    /// A single shared in-memory database (tests, demos).
    InMemory,
    /// A database file; every execution call opens its own connection.
    File(PathBuf),
}

/// Column metadata for one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub columns: Vec<String>,
    pub types: Vec<String>,
    pub primary_keys: Vec<String>,
}

/// Table name to metadata, ordered so prompt construction is deterministic.
pub type Schema = BTreeMap<String, TableInfo>;

/// Result of executing one candidate query. Execution failure is data here,
/// not an error: the evaluator turns it into a low reward.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub success: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            columns: Vec::new(),
            rows: Vec::new(),
            error: Some(message),
        }
    }
}

/// Handle to the target database.
#[derive(Debug)]
pub struct SqlDatabase {
    mode: DatabaseMode,
    // Only populated for DatabaseMode::InMemory.
    shared: Option<Mutex<Connection>>,
}

impl SqlDatabase {
    pub fn open(mode: DatabaseMode) -> Result<Self> {
        let shared = match &mode {
            DatabaseMode::InMemory => Some(Mutex::new(Connection::open_in_memory()?)),
            DatabaseMode::File(path) => {
                // Fail fast at startup if the file cannot be opened at all.
                Connection::open(path)?;
                None
            }
        };
        Ok(Self { mode, shared })
    }

    /// Run `f` against a connection appropriate for the mode.
    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        match (&self.mode, &self.shared) {
            (DatabaseMode::InMemory, Some(shared)) => {
                let conn = shared
                    .lock()
                    .map_err(|e| ScoutError::Invariant(format!("connection lock poisoned: {e}")))?;
                f(&conn)
            }
            (DatabaseMode::File(path), _) => {
                let conn = Connection::open(path)?;
                f(&conn)
            }
            (DatabaseMode::InMemory, None) => Err(ScoutError::Invariant(
                "in-memory database without shared connection".into(),
            )),
        }
    }

    /// Map every table to its columns, declared types and primary keys.
    pub fn introspect_schema(&self) -> Result<Schema> {
        self.with_connection(|conn| {
            let mut schema = Schema::new();
            let mut tables = conn.prepare(
                "select name from sqlite_master where type = 'table' \
                 and name not like 'sqlite_%'",
            )?;
            let names = tables
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            for table in names {
                let mut info = TableInfo {
                    columns: Vec::new(),
                    types: Vec::new(),
                    primary_keys: Vec::new(),
                };
                let mut pragma = conn.prepare(&format!("pragma table_info(\"{table}\")"))?;
                let mut rows = pragma.query([])?;
                while let Some(row) = rows.next()? {
                    let name: String = row.get(1)?;
                    let declared_type: String = row.get(2)?;
                    let pk: i64 = row.get(5)?;
                    if pk > 0 {
                        info.primary_keys.push(name.clone());
                    }
                    info.columns.push(name);
                    info.types.push(declared_type);
                }
                schema.insert(table, info);
            }
            Ok(schema)
        })
        .map_err(|e| ScoutError::Introspection(e.to_string()))
    }

    /// Execute one candidate query, absorbing any SQLite error into the
    /// outcome. Never returns `Err` for bad SQL; only infrastructure
    /// problems (a vanished database file, a poisoned lock) surface.
    pub fn execute_query(&self, sql: &str) -> QueryOutcome {
        let executed = self.with_connection(|conn| {
            let mut stmt = match conn.prepare(sql) {
                Ok(stmt) => stmt,
                Err(e) => return Ok(QueryOutcome::failure(e.to_string())),
            };
            let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
            let mut rows = Vec::new();
            let mut result = match stmt.query([]) {
                Ok(result) => result,
                Err(e) => return Ok(QueryOutcome::failure(e.to_string())),
            };
            loop {
                match result.next() {
                    Ok(Some(row)) => {
                        let mut rendered = Vec::with_capacity(columns.len());
                        for i in 0..columns.len() {
                            rendered.push(render_value(row.get_ref(i)?));
                        }
                        rows.push(rendered);
                    }
                    Ok(None) => break,
                    Err(e) => return Ok(QueryOutcome::failure(e.to_string())),
                }
            }
            Ok(QueryOutcome {
                success: true,
                columns,
                rows,
                error: None,
            })
        });
        match executed {
            Ok(outcome) => {
                debug!(
                    success = outcome.success,
                    rows = outcome.rows.len(),
                    "query executed"
                );
                outcome
            }
            Err(e) => QueryOutcome::failure(e.to_string()),
        }
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "null".into(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}
