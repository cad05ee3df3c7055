//! Conditional table creation from a [`SchemaCatalog`].

use log::{debug, info, warn};

use crate::{
    outcome::{Outcome, UnitReport, tally},
    schema::{SchemaCatalog, TableDefinition},
    store::{Destination, StoreError, isolated, quote_identifier},
};

const CREATE_SAVEPOINT: &str = "create_table";

/// `CREATE TABLE IF NOT EXISTS "name" ("col" type, ...)` in catalog order.
pub fn create_table_statement(table: &TableDefinition) -> String {
    let columns = table
        .columns
        .iter()
        .map(|column| {
            format!(
                "{} {}",
                quote_identifier(&column.name),
                column.declared_type
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({columns})",
        quote_identifier(&table.name)
    )
}

pub fn create_statements(catalog: &SchemaCatalog) -> Vec<String> {
    catalog.tables().map(create_table_statement).collect()
}

/// Creates every table of `catalog` that does not exist yet.
///
/// Each table runs inside its own savepoint: a statement the destination
/// rejects is rolled back and reported as skipped while the remaining tables
/// are still attempted. Everything is committed once at the end.
pub fn create_tables<D>(dest: &mut D, catalog: &SchemaCatalog) -> Result<Vec<UnitReport>, StoreError>
where
    D: Destination + ?Sized,
{
    dest.begin()?;
    let mut reports = Vec::with_capacity(catalog.len());
    for table in catalog.tables() {
        let statement = create_table_statement(table);
        debug!("Creating table {} with SQL: {statement}", table.name);
        let result = isolated(dest, CREATE_SAVEPOINT, |d| d.execute(&statement).map(|_| ()));
        if let Err(err) = &result {
            warn!("Failed to create table {}: {err}", table.name);
        }
        reports.push(UnitReport::new(table.name.clone(), Outcome::from_result(result)));
    }
    dest.commit()?;

    let (created, skipped) = tally(&reports);
    info!("Table creation finished: {created} ensured, {skipped} skipped");
    Ok(reports)
}
