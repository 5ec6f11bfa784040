//! SQLite-backed [`Warehouse`].

use std::path::{Path, PathBuf};

use ranking_core::error::{RankingError, Result};
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql};
use serde_json::Value;
use tracing::debug;

use crate::reporting::{QueryParam, Row, Warehouse};

impl ToSql for QueryParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            QueryParam::Null => ToSqlOutput::Owned(SqlValue::Null),
            QueryParam::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            QueryParam::Real(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            QueryParam::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// A warehouse stored in a SQLite database file.
///
/// Every [`fetch`](Warehouse::fetch) opens its own read-only connection and
/// closes it before returning; nothing is shared between calls.
#[derive(Debug, Clone)]
pub struct SqliteWarehouse {
    path: PathBuf,
}

impl SqliteWarehouse {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| query_error(&self.path, e))
    }
}

impl Warehouse for SqliteWarehouse {
    fn fetch(&self, query: &str, params: &[QueryParam]) -> Result<Vec<Row>> {
        let conn = self.open()?;
        let rows = run_query(&conn, query, params).map_err(|e| query_error(&self.path, e))?;
        conn.close().map_err(|(_, e)| query_error(&self.path, e))?;
        debug!(rows = rows.len(), "warehouse query finished");
        Ok(rows)
    }
}

fn run_query(
    conn: &Connection,
    query: &str,
    params: &[QueryParam],
) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(query)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut mapped = Row::new();
        for (i, name) in columns.iter().enumerate() {
            mapped.insert(name.clone(), to_json(row.get_ref(i)?));
        }
        out.push(mapped);
    }
    Ok(out)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            Value::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}

fn query_error(path: &Path, e: rusqlite::Error) -> RankingError {
    RankingError::Query(format!("{}: {}", path.display(), e))
}
