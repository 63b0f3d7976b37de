//! SQLite table sink
//!
//! Each bulk insert runs in one transaction with a cached prepared statement,
//! so a batch is stored completely or not at all.

use super::{ColumnNameMap, RowSink};
use crate::batch::Batch;
use crate::error::{LoaderError, Result};
use crate::mapping::{ColumnSchema, Value, ValueKind};
use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::Path;
use tracing::debug;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::String(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Boolean(b) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*b))),
            // Stored as text to keep the exact scale
            Value::Decimal(d) => ToSqlOutput::Owned(rusqlite::types::Value::Text(d.to_string())),
            Value::DateTime(dt) => ToSqlOutput::Owned(rusqlite::types::Value::Text(dt.to_rfc3339())),
        })
    }
}

/// Bulk-inserts batches into one table of a SQLite database
#[derive(Debug)]
pub struct SqliteSink {
    conn: Connection,
    table: String,
    names: ColumnNameMap,
}

impl SqliteSink {
    /// Open (or create) a database file
    pub fn open(path: &Path, table: impl Into<String>, names: ColumnNameMap) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn, table, names))
    }

    /// Private in-memory database, mostly for tests and dry runs
    pub fn in_memory(table: impl Into<String>, names: ColumnNameMap) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn, table, names))
    }

    pub fn from_connection(conn: Connection, table: impl Into<String>, names: ColumnNameMap) -> Self {
        Self {
            conn,
            table: table.into(),
            names,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the destination table when it does not exist yet
    pub fn create_table(&self, columns: &[ColumnSchema]) -> Result<()> {
        if columns.is_empty() {
            return Err(LoaderError::configuration(
                "cannot create a table without columns",
            ));
        }

        let definitions: Vec<String> = columns
            .iter()
            .map(|column| {
                format!(
                    "{} {}",
                    quote_identifier(self.names.storage_name(&column.name)),
                    sql_type(&column.kind)
                )
            })
            .collect();

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&self.table),
            definitions.join(", ")
        );
        debug!("Creating table: {}", sql);
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    fn insert_statement(&self, columns: &[ColumnSchema]) -> String {
        let names: Vec<String> = columns
            .iter()
            .map(|column| quote_identifier(self.names.storage_name(&column.name)))
            .collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&self.table),
            names.join(", "),
            placeholders.join(", ")
        )
    }

    fn insert_rows(&mut self, batch: &Batch) -> Result<()> {
        let sql = self.insert_statement(batch.columns());
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in batch.rows() {
                stmt.execute(params_from_iter(row.values()))?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl RowSink for SqliteSink {
    async fn bulk_insert(&mut self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.insert_rows(batch)?;
        debug!("Inserted {} rows into {}", batch.len(), self.table);
        Ok(())
    }

    async fn count_rows(&mut self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(&self.table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    async fn truncate(&mut self) -> Result<()> {
        let sql = format!("DELETE FROM {}", quote_identifier(&self.table));
        let removed = self.conn.execute(&sql, [])?;
        debug!("Truncated {}: {} rows removed", self.table, removed);
        Ok(())
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(kind: &ValueKind) -> &'static str {
    match kind.underlying() {
        ValueKind::Integer | ValueKind::Boolean => "INTEGER",
        ValueKind::String | ValueKind::Decimal | ValueKind::DateTime => "TEXT",
        ValueKind::Nullable(_) => "TEXT",
    }
}
