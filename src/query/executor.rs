//! Query Executor
//!
//! The seam between the query runner and a database. An executor takes
//! fully expanded SQL and returns the column headers plus a row cursor:
//!
//! ```text
//! SQL → QueryExecutor::execute → ResultSet { columns, rows }
//! ```
//!
//! `SqliteExecutor` is the bundled implementation, backed by rusqlite.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::frame::{resolve, ColumnDescriptor, RawValue, RowScanError, SemanticType};
use crate::query::error::{QueryError, QueryResult};

/// Rows produced by an executor
pub struct RowCursor {
    inner: Box<dyn Iterator<Item = Result<Vec<RawValue>, RowScanError>> + Send>,
}

impl RowCursor {
    pub fn new<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Result<Vec<RawValue>, RowScanError>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            inner: Box::new(rows.into_iter()),
        }
    }

    /// Cursor over rows that are all readable
    pub fn from_rows(rows: Vec<Vec<RawValue>>) -> Self {
        Self::new(rows.into_iter().map(Ok))
    }

    pub fn empty() -> Self {
        Self::from_rows(Vec::new())
    }
}

impl Iterator for RowCursor {
    type Item = Result<Vec<RawValue>, RowScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl std::fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor").finish_non_exhaustive()
    }
}

/// Column headers and rows of an executed query
#[derive(Debug)]
pub struct ResultSet {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: RowCursor,
}

/// Something that can run SQL and hand back rows
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute already expanded SQL
    async fn execute(&self, sql: &str) -> QueryResult<ResultSet>;
}

/// Executor backed by a single SQLite connection
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> QueryResult<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> QueryResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run statements that return no rows (schema setup, inserts)
    pub async fn execute_batch(&self, sql: &str) -> QueryResult<()> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || -> QueryResult<()> {
            let conn = lock(&conn)?;
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
        .map_err(|e| QueryError::Execution(format!("SQLite task failed: {}", e)))?
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn execute(&self, sql: &str) -> QueryResult<ResultSet> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || -> QueryResult<ResultSet> {
            let conn = lock(&conn)?;
            query_blocking(&conn, &sql)
        })
        .await
        .map_err(|e| QueryError::Execution(format!("SQLite task failed: {}", e)))?
    }
}

fn lock(conn: &Mutex<Connection>) -> QueryResult<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| QueryError::Execution(format!("Failed to acquire connection lock: {}", e)))
}

/// Run a query and buffer its rows; a failing row ends the cursor with an error
fn query_blocking(conn: &Connection, sql: &str) -> QueryResult<ResultSet> {
    let mut stmt = conn.prepare(sql)?;

    let columns: Vec<ColumnDescriptor> = stmt
        .columns()
        .iter()
        .map(|c| ColumnDescriptor::new(c.name(), c.decl_type().unwrap_or("")))
        .collect();
    let temporal: Vec<bool> = columns
        .iter()
        .map(|c| resolve("", &c.type_name, false) == Ok(SemanticType::Time))
        .collect();

    let mut buffered = Vec::new();
    let mut rows = stmt.query([])?;

    loop {
        match rows.next() {
            Ok(Some(row)) => match read_row(row, &temporal) {
                Ok(values) => buffered.push(Ok(values)),
                Err(e) => {
                    buffered.push(Err(RowScanError::new(e.to_string())));
                    break;
                }
            },
            Ok(None) => break,
            Err(e) => {
                buffered.push(Err(RowScanError::new(e.to_string())));
                break;
            }
        }
    }

    debug!(columns = columns.len(), rows = buffered.len(), "SQLite query finished");

    Ok(ResultSet {
        columns,
        rows: RowCursor::new(buffered),
    })
}

fn read_row(row: &rusqlite::Row<'_>, temporal: &[bool]) -> rusqlite::Result<Vec<RawValue>> {
    temporal
        .iter()
        .enumerate()
        .map(|(idx, &is_temporal)| row.get_ref(idx).map(|v| to_raw(v, is_temporal)))
        .collect()
}

fn to_raw(value: ValueRef<'_>, temporal: bool) -> RawValue {
    match value {
        ValueRef::Null => RawValue::Null,
        ValueRef::Integer(i) => RawValue::Int(i),
        ValueRef::Real(f) => RawValue::Float(f),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            match temporal.then(|| parse_sqlite_datetime(&text)).flatten() {
                Some(instant) => RawValue::Time(instant),
                None => RawValue::Text(text.into_owned()),
            }
        }
        ValueRef::Blob(bytes) => RawValue::Bytes(bytes.to_vec()),
    }
}

/// Parse the textual date/time forms SQLite stores, all taken as UTC
fn parse_sqlite_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn seeded() -> SqliteExecutor {
        let executor = SqliteExecutor::open_in_memory().unwrap();
        executor
            .execute_batch(
                "CREATE TABLE samples (ts TIMESTAMP, host VARCHAR(16), value REAL, raw BLOB);
                 INSERT INTO samples VALUES ('2021-01-01 12:00:00', 'a', 1.5, x'0102');
                 INSERT INTO samples VALUES ('2021-01-01T12:01:00Z', NULL, NULL, NULL);",
            )
            .await
            .unwrap();
        executor
    }

    #[tokio::test]
    async fn test_column_descriptors() {
        let executor = seeded().await;
        let result = executor
            .execute("SELECT ts, host, value, raw, 1 AS one FROM samples")
            .await
            .unwrap();

        let types: Vec<_> = result
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.type_name.as_str()))
            .collect();
        assert_eq!(
            types,
            vec![
                ("ts", "TIMESTAMP"),
                ("host", "VARCHAR(16)"),
                ("value", "REAL"),
                ("raw", "BLOB"),
                ("one", "")
            ]
        );
    }

    #[tokio::test]
    async fn test_row_values() {
        let executor = seeded().await;
        let result = executor
            .execute("SELECT ts, host, value, raw FROM samples ORDER BY ts")
            .await
            .unwrap();

        let rows: Vec<_> = result.rows.collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![
                RawValue::Time(Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap()),
                RawValue::from("a"),
                RawValue::Float(1.5),
                RawValue::Bytes(vec![1, 2]),
            ]
        );
        assert_eq!(
            rows[1],
            vec![
                RawValue::Time(Utc.with_ymd_and_hms(2021, 1, 1, 12, 1, 0).unwrap()),
                RawValue::Null,
                RawValue::Null,
                RawValue::Null,
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_sql() {
        let executor = SqliteExecutor::open_in_memory().unwrap();
        let err = executor.execute("SELEC nonsense").await.unwrap_err();
        assert!(matches!(err, QueryError::Execution(_)));
    }

    #[tokio::test]
    async fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let executor = SqliteExecutor::open(&path).unwrap();
        executor
            .execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
            .await
            .unwrap();

        let reopened = SqliteExecutor::open(&path).unwrap();
        let result = reopened.execute("SELECT v FROM t").await.unwrap();
        let rows: Vec<_> = result.rows.collect::<Result<_, _>>().unwrap();
        assert_eq!(rows, vec![vec![RawValue::Int(7)]]);
    }

    #[test]
    fn test_parse_sqlite_datetime() {
        let noon = Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_sqlite_datetime("2021-01-01 12:00:00"), Some(noon));
        assert_eq!(parse_sqlite_datetime("2021-01-01 12:00:00.000"), Some(noon));
        assert_eq!(parse_sqlite_datetime("2021-01-01T12:00:00+00:00"), Some(noon));
        assert_eq!(
            parse_sqlite_datetime("2021-01-01"),
            Some(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_sqlite_datetime("yesterday"), None);
    }
}
