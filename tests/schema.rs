mod common;

use bank_csv_loader::error::LoadError;
use bank_csv_loader::schema::SchemaCatalog;
use common::{BANK_SCHEMA, SCHEMA_HEADER, TestWorkspace};
use encoding_rs::UTF_8;

#[test]
fn bank_schema_yields_one_definition_per_table() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("INFORMATION_SCHEMA.csv", BANK_SCHEMA);

    let catalog = SchemaCatalog::from_path(&path, b',', UTF_8).expect("parse schema");

    assert_eq!(catalog.table_names(), vec!["checking", "loans", "transactions"]);
    assert_eq!(catalog.column_count(), 8);
    let transactions = catalog.get("transactions").unwrap();
    assert_eq!(
        transactions.column_names(),
        vec!["transaction_id", "account_id", "amount"]
    );
    assert_eq!(transactions.columns[2].declared_type, "numeric(12,2) NOT NULL");
}

#[test]
fn degenerate_quoted_header_is_resplit() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "INFORMATION_SCHEMA.csv",
        "\"TABLE_NAME,COLUMN_NAME,DATA_TYPE\"\nLoans,Rate,real\n",
    );

    let catalog = SchemaCatalog::from_path(&path, b',', UTF_8).expect("parse schema");

    let loans = catalog.get("loans").expect("loans table");
    assert_eq!(loans.column_names(), vec!["rate"]);
    assert_eq!(loans.columns[0].declared_type, "real");
}

#[test]
fn row_that_cannot_be_repaired_fails_whole_parse() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "INFORMATION_SCHEMA.csv",
        &format!("{SCHEMA_HEADER}\nbank,public,checking,account_id,integer\nbank,public,checking\nbank,public,loans,account_id,integer\n"),
    );

    let err = SchemaCatalog::from_path(&path, b',', UTF_8).unwrap_err();

    match err.downcast_ref::<LoadError>() {
        Some(LoadError::MalformedSchemaRow {
            line,
            expected,
            found,
            fields,
        }) => {
            assert_eq!(*line, 3);
            assert_eq!(*expected, 5);
            assert_eq!(*found, 3);
            assert_eq!(fields, &vec!["bank", "public", "checking"]);
        }
        other => panic!("expected malformed row error, got {other:?}"),
    }
}

#[test]
fn overflow_is_only_repaired_from_the_fifth_field() {
    // Six header fields: the repair folds fields 5.. into one, leaving five.
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "INFORMATION_SCHEMA.csv",
        "TABLE_CATALOG,TABLE_SCHEMA,TABLE_NAME,COLUMN_NAME,DATA_TYPE,IS_NULLABLE\nbank,public,loans,rate,numeric(5,3),YES\n",
    );

    let err = SchemaCatalog::from_path(&path, b',', UTF_8).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<LoadError>(),
        Some(LoadError::MalformedSchemaRow { expected: 6, found: 5, .. })
    ));
}

#[test]
fn additional_header_fields_are_ignored() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "INFORMATION_SCHEMA.csv",
        "TABLE_CATALOG,TABLE_SCHEMA,TABLE_NAME,COLUMN_NAME,DATA_TYPE\n bank , public , Checking , Account_ID , \"integer\" \n",
    );

    let catalog = SchemaCatalog::from_path(&path, b',', UTF_8).expect("parse schema");

    let checking = catalog.get("checking").unwrap();
    assert_eq!(checking.column_names(), vec!["account_id"]);
    assert_eq!(checking.columns[0].declared_type, "integer");
}
