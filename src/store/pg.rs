use log::debug;
use postgres::{Client, NoTls, SimpleQueryMessage, types::ToSql};

use super::{
    Destination, DestinationColumn, QueryResult, SqlValue, StoreError, insert_statement,
    quote_identifier,
};
use crate::config::ConnectionConfig;

const COLUMNS_SQL: &str = "SELECT column_name::text, udt_name::text \
     FROM information_schema.columns \
     WHERE table_schema = current_schema() AND table_name = $1 \
     ORDER BY ordinal_position";

pub struct PostgresDestination {
    client: Option<Client>,
    label: String,
}

impl PostgresDestination {
    pub fn connect(config: &ConnectionConfig) -> Result<Self, StoreError> {
        let mut pg = postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user);
        if let Some(password) = &config.password {
            pg.password(password);
        }
        let client = pg.connect(NoTls)?;
        Ok(Self {
            client: Some(client),
            label: config.describe(),
        })
    }

    fn client(&mut self) -> Result<&mut Client, StoreError> {
        self.client.as_mut().ok_or(StoreError::Closed)
    }
}

impl Destination for PostgresDestination {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), StoreError> {
        self.client()?.batch_execute(sql)?;
        Ok(())
    }

    // The extended protocol refuses to prepare more than one command.
    fn execute(&mut self, sql: &str) -> Result<u64, StoreError> {
        Ok(self.client()?.execute(sql, &[])?)
    }

    fn table_columns(&mut self, table: &str) -> Result<Vec<DestinationColumn>, StoreError> {
        let rows = self.client()?.query(COLUMNS_SQL, &[&table])?;
        Ok(rows
            .iter()
            .map(|row| DestinationColumn {
                name: row.get(0),
                type_name: row.get(1),
            })
            .collect())
    }

    // Values travel as text and are cast to the live column type, so numeric
    // and date columns accept the raw CSV representation.
    fn insert_row(
        &mut self,
        table: &str,
        columns: &[DestinationColumn],
        values: &[Option<String>],
    ) -> Result<(), StoreError> {
        let sql = insert_statement(table, columns, |position, column| {
            format!("${position}::text::{}", quote_identifier(&column.type_name))
        });
        let params = values
            .iter()
            .map(|value| value as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();
        self.client()?.execute(sql.as_str(), &params)?;
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, StoreError> {
        let messages = self.client()?.simple_query(sql)?;
        let mut result = QueryResult::default();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if result.columns.is_empty() {
                    result.columns = row
                        .columns()
                        .iter()
                        .map(|column| column.name().to_string())
                        .collect();
                }
                let values = (0..row.len())
                    .map(|idx| match row.get(idx) {
                        Some(text) => SqlValue::Text(text.to_string()),
                        None => SqlValue::Null,
                    })
                    .collect();
                result.rows.push(values);
            }
        }
        Ok(result)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(client) = self.client.take() {
            debug!("Closing {}", self.label);
            client.close()?;
        }
        Ok(())
    }
}
