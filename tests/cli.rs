mod common;

use assert_cmd::Command;
use common::{SCHEMA_HEADER, TestWorkspace};
use predicates::prelude::*;
use predicates::str::contains;

fn loader() -> Command {
    let mut cmd = Command::cargo_bin("bank-csv-loader").expect("binary exists");
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn load_into_sqlite_prints_summary_and_reports() {
    let workspace = TestWorkspace::new();
    workspace.write_bank_data();
    let db_path = workspace.path().join("bank.db");

    loader()
        .args([
            "load",
            "--data-dir",
            workspace.path().to_str().unwrap(),
            "--sqlite",
            db_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("transactions"))
        .stdout(contains("Overdrawn accounts (1):"))
        .stdout(contains("-25.00"))
        .stdout(contains("Overpaid loans (1):"))
        .stdout(contains("Total asset size: 15.00"));

    assert!(db_path.exists());
}

#[test]
fn report_runs_against_existing_database() {
    let workspace = TestWorkspace::new();
    workspace.write_bank_data();
    let db_path = workspace.path().join("bank.db");
    loader()
        .args([
            "load",
            "-d",
            workspace.path().to_str().unwrap(),
            "--sqlite",
            db_path.to_str().unwrap(),
            "--skip-report",
        ])
        .assert()
        .success()
        .stdout(contains("Total asset size").not());

    loader()
        .args(["report", "--sqlite", db_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Total asset size: 15.00"));
}

#[test]
fn ddl_prints_conditional_create_statements() {
    let workspace = TestWorkspace::new();
    let schema = workspace.write("INFORMATION_SCHEMA.csv", common::BANK_SCHEMA);

    loader()
        .args(["ddl", "--schema", schema.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains(
            "CREATE TABLE IF NOT EXISTS \"checking\" (\"account_id\" integer, \"customer\" varchar(40), \"starting_balance\" numeric(12,2));",
        ));
}

#[test]
fn malformed_schema_fails_the_run() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "INFORMATION_SCHEMA.csv",
        &format!("{SCHEMA_HEADER}\nbank,public,checking\n"),
    );
    let db_path = workspace.path().join("bank.db");

    loader()
        .args([
            "load",
            "-d",
            workspace.path().to_str().unwrap(),
            "--sqlite",
            db_path.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("Malformed schema row"));

    assert!(!db_path.exists());
}

#[test]
fn missing_config_section_is_reported() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("database.yaml", "mysql:\n  host: localhost\n");

    loader()
        .args(["report", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Section 'postgresql' is not found"));
}

#[test]
fn report_layout_from_config_applies_to_sqlite_destination() {
    let workspace = TestWorkspace::new();
    workspace.write_bank_data();
    let db_path = workspace.path().join("bank.db");
    loader()
        .args([
            "load",
            "-d",
            workspace.path().to_str().unwrap(),
            "--sqlite",
            db_path.to_str().unwrap(),
            "--skip-report",
        ])
        .assert()
        .success();
    let config = workspace.write(
        "report.yaml",
        "report:\n  checking:\n    table: loans\n    id_column: account_id\n    starting_column: starting_debt\n",
    );

    // Checking figures now come from the loans table: 100.00 - 110.00 on account 100.
    loader()
        .args([
            "report",
            "--sqlite",
            db_path.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("Overdrawn accounts (1):"))
        .stdout(contains("100"))
        .stdout(contains("Total asset size: -20.00"));
}
