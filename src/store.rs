use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::extract::ExtractError;

/// A single SQLite column value, detached from the statement that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ColumnValue {
    fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Null => "null",
            ColumnValue::Integer(_) => "integer",
            ColumnValue::Real(_) => "real",
            ColumnValue::Text(_) => "text",
            ColumnValue::Blob(_) => "blob",
        }
    }
}

impl From<ValueRef<'_>> for ColumnValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => ColumnValue::Null,
            ValueRef::Integer(i) => ColumnValue::Integer(i),
            ValueRef::Real(f) => ColumnValue::Real(f),
            ValueRef::Text(t) => ColumnValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => ColumnValue::Blob(b.to_vec()),
        }
    }
}

/// A result row with named columns and typed accessors.
///
/// Accessors fail with [`ExtractError::RowDecode`] when the column is missing
/// or holds a value of another type.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<ColumnValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<ColumnValue>) -> Self {
        Self { columns, values }
    }

    pub fn value(&self, name: &str) -> Result<&ColumnValue, ExtractError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| ExtractError::RowDecode(format!("missing column {name}")))
    }

    pub fn opt_int(&self, name: &str) -> Result<Option<i64>, ExtractError> {
        match self.value(name)? {
            ColumnValue::Null => Ok(None),
            ColumnValue::Integer(i) => Ok(Some(*i)),
            other => Err(mismatch(name, "integer", other)),
        }
    }

    pub fn opt_text(&self, name: &str) -> Result<Option<String>, ExtractError> {
        match self.value(name)? {
            ColumnValue::Null => Ok(None),
            ColumnValue::Text(t) => Ok(Some(t.clone())),
            other => Err(mismatch(name, "text", other)),
        }
    }
}

fn mismatch(name: &str, expected: &str, found: &ColumnValue) -> ExtractError {
    ExtractError::RowDecode(format!(
        "column {name}: expected {expected}, found {}",
        found.type_name()
    ))
}

/// Read-only handle on one SQLite store. The connection closes on drop.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::NotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| ExtractError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_table(&self, name: &str) -> Result<bool, ExtractError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")
            .map_err(ExtractError::Query)?;
        let mut rows = stmt.query([name]).map_err(ExtractError::Query)?;
        Ok(rows.next().map_err(ExtractError::Query)?.is_some())
    }

    /// Whether `table` exists and has a column called `column`.
    pub fn has_column(&self, table: &str, column: &str) -> Result<bool, ExtractError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2")
            .map_err(ExtractError::Query)?;
        let mut rows = stmt.query([table, column]).map_err(ExtractError::Query)?;
        Ok(rows.next().map_err(ExtractError::Query)?.is_some())
    }

    /// Run `sql` and collect every row.
    ///
    /// Preparing or starting the query fails as a whole with
    /// [`ExtractError::Query`]. A failure while stepping through the result
    /// set is reported as a trailing [`ExtractError::RowDecode`] entry and
    /// ends the result set, rows read before it are kept.
    pub fn rows(&self, sql: &str) -> Result<Vec<Result<Row, ExtractError>>, ExtractError> {
        let mut stmt = self.conn.prepare(sql).map_err(ExtractError::Query)?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = columns.len();
        let mut rows = stmt.query([]).map_err(ExtractError::Query)?;

        let mut out = Vec::new();
        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let values: Result<Vec<ColumnValue>, rusqlite::Error> = (0..width)
                        .map(|idx| row.get_ref(idx).map(ColumnValue::from))
                        .collect();
                    out.push(
                        values
                            .map(|values| Row::new(columns.clone(), values))
                            .map_err(|e| ExtractError::RowDecode(e.to_string())),
                    );
                }
                Ok(None) => break,
                Err(e) => {
                    out.push(Err(ExtractError::RowDecode(e.to_string())));
                    break;
                }
            }
        }
        Ok(out)
    }
}
