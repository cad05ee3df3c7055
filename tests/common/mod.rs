#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use bank_csv_loader::store::{Destination, SqliteDestination, SqlValue};
use tempfile::{TempDir, tempdir};

pub const SCHEMA_HEADER: &str = "TABLE_CATALOG,TABLE_SCHEMA,TABLE_NAME,COLUMN_NAME,DATA_TYPE";

/// Schema export with unquoted `numeric(p,s)` types, as produced by the bank's
/// export tooling.
pub const BANK_SCHEMA: &str = "TABLE_CATALOG,TABLE_SCHEMA,TABLE_NAME,COLUMN_NAME,DATA_TYPE
bank,public,checking,account_id,integer
bank,public,checking,customer,varchar(40)
bank,public,checking,starting_balance,numeric(12,2)
bank,public,loans,account_id,integer
bank,public,loans,starting_debt,numeric(12,2)
bank,public,transactions,transaction_id,integer
bank,public,transactions,account_id,integer
bank,public,transactions,amount,numeric(12,2) NOT NULL
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Lays out a complete data directory: schema source plus one file per table.
    pub fn write_bank_data(&self) {
        self.write("INFORMATION_SCHEMA.csv", BANK_SCHEMA);
        self.write(
            "checking.csv",
            "Account_ID,Customer,Starting_Balance\n1,Ada,100.00\n2,Grace,50.00\n",
        );
        self.write("loans.csv", "account_id,starting_debt\n100,100.00\n");
        self.write(
            "transactions.csv",
            "transaction_id,account_id,amount\n1,1,-50.00\n2,1,-75.00\n3,100,-110.00\n",
        );
    }
}

pub fn memory_db() -> SqliteDestination {
    SqliteDestination::in_memory().expect("open in-memory sqlite")
}

pub fn count_rows(dest: &mut dyn Destination, table: &str) -> i64 {
    let result = dest
        .query(&format!("SELECT COUNT(*) FROM \"{table}\""))
        .expect("count rows");
    match result.rows.first().and_then(|row| row.first()) {
        Some(SqlValue::Integer(count)) => *count,
        other => panic!("unexpected count result {other:?}"),
    }
}
