use std::path::Path;

use log::debug;
use rusqlite::{Connection, params_from_iter, types::ValueRef};

use super::{
    Destination, DestinationColumn, QueryResult, SqlValue, StoreError, insert_statement,
    quote_identifier,
};

pub struct SqliteDestination {
    conn: Option<Connection>,
    label: String,
}

impl SqliteDestination {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Some(conn),
            label: format!("sqlite:{}", path.display()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Some(conn),
            label: "sqlite::memory:".to_string(),
        })
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }
}

impl Destination for SqliteDestination {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), StoreError> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<u64, StoreError> {
        let changed = self.conn()?.execute(sql, [])?;
        Ok(changed as u64)
    }

    fn table_columns(&mut self, table: &str) -> Result<Vec<DestinationColumn>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(DestinationColumn {
                    name: row.get(1)?,
                    type_name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn insert_row(
        &mut self,
        table: &str,
        columns: &[DestinationColumn],
        values: &[Option<String>],
    ) -> Result<(), StoreError> {
        let sql = insert_statement(table, columns, |_, _| "?".to_string());
        self.conn()?.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let width = columns.len();
        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(match row.get_ref(idx)? {
                    ValueRef::Null => SqlValue::Null,
                    ValueRef::Integer(i) => SqlValue::Integer(i),
                    ValueRef::Real(f) => SqlValue::Real(f),
                    ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                        SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
                    }
                });
            }
            rows.push(values);
        }
        Ok(QueryResult { columns, rows })
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(conn) = self.conn.take() {
            debug!("Closing {}", self.label);
            conn.close().map_err(|(_, err)| err)?;
        }
        Ok(())
    }
}
