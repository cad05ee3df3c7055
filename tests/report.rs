mod common;

use bank_csv_loader::outcome::Outcome;
use bank_csv_loader::report::{
    AccountBalanceRow, Attribution, ReportLayout, overdrawn_accounts, overpaid_loans,
    run_analysis, run_analysis_with, total_asset_size,
};
use bank_csv_loader::store::{Destination, SqliteDestination};
use common::memory_db;
use rust_decimal::Decimal;

fn db_with(statements: &str) -> SqliteDestination {
    let mut dest = memory_db();
    dest.execute_batch(
        "CREATE TABLE checking (account_id INTEGER, starting_balance NUMERIC(12,2));
         CREATE TABLE loans (account_id INTEGER, starting_debt NUMERIC(12,2));
         CREATE TABLE transactions (transaction_id INTEGER, account_id INTEGER, amount NUMERIC(12,2), account_type TEXT);",
    )
    .expect("create tables");
    dest.execute_batch(statements).expect("seed rows");
    dest
}

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[test]
fn overdrawn_checking_account_reports_all_three_figures() {
    let mut dest = db_with(
        "INSERT INTO checking VALUES (1, 100.00), (2, 50.00);
         INSERT INTO transactions VALUES (1, 1, -50.00, NULL), (2, 1, -75.00, NULL);",
    );
    let layout = ReportLayout::default();

    let rows = overdrawn_accounts(&mut dest, &layout, &layout.attribution).expect("query");

    assert_eq!(
        rows,
        vec![AccountBalanceRow {
            account_id: "1".to_string(),
            starting_value: money(10000),
            transaction_total: money(-12500),
            ending_balance: money(-2500),
        }]
    );
}

#[test]
fn balance_that_rounds_to_zero_is_not_overdrawn() {
    let mut dest = db_with(
        "INSERT INTO checking VALUES (1, 0.30);
         INSERT INTO loans VALUES (7, 0.30);
         INSERT INTO transactions VALUES (1, 1, -0.10, NULL), (2, 1, -0.20, NULL),
                                         (3, 7, -0.10, NULL), (4, 7, -0.20, NULL);",
    );
    let layout = ReportLayout::default();

    let overdrawn = overdrawn_accounts(&mut dest, &layout, &layout.attribution).expect("checking");
    let overpaid = overpaid_loans(&mut dest, &layout, &layout.attribution).expect("loans");
    let total = total_asset_size(&mut dest, &layout, &layout.attribution).expect("total");

    assert!(overdrawn.is_empty(), "unexpected rows {overdrawn:?}");
    assert!(overpaid.is_empty(), "unexpected rows {overpaid:?}");
    assert_eq!(format!("{total:.2}"), "0.00");
}

#[test]
fn account_without_transactions_keeps_its_starting_balance() {
    let mut dest = db_with("INSERT INTO checking VALUES (2, -5.25);");
    let layout = ReportLayout::default();

    let rows = overdrawn_accounts(&mut dest, &layout, &layout.attribution).expect("query");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].transaction_total, Decimal::ZERO);
    assert_eq!(rows[0].ending_balance, money(-525));
}

#[test]
fn total_assets_combine_checking_and_loan_balances() {
    let mut dest = db_with(
        "INSERT INTO checking VALUES (2, 50.00);
         INSERT INTO loans VALUES (100, 100.00);
         INSERT INTO transactions VALUES (1, 100, -110.00, NULL);",
    );
    let layout = ReportLayout::default();

    let overpaid = overpaid_loans(&mut dest, &layout, &layout.attribution).expect("loans");
    let total = total_asset_size(&mut dest, &layout, &layout.attribution).expect("total");

    assert_eq!(overpaid.len(), 1);
    assert_eq!(overpaid[0].account_id, "100");
    assert_eq!(overpaid[0].ending_balance, money(-1000));
    assert_eq!(total, money(4000));
}

#[test]
fn category_column_attribution_splits_shared_ids() {
    let mut dest = db_with(
        "INSERT INTO checking VALUES (1, 100.00);
         INSERT INTO loans VALUES (1, 20.00);
         INSERT INTO transactions VALUES (1, 1, -150.00, 'CHK'), (2, 1, -30.00, 'LN');",
    );
    let shared = ReportLayout::default();
    let by_category = ReportLayout {
        attribution: Attribution::CategoryColumn {
            column: "account_type".into(),
            checking: "CHK".into(),
            loan: "LN".into(),
        },
        ..ReportLayout::default()
    };

    let shared_rows = overdrawn_accounts(&mut dest, &shared, &shared.attribution).unwrap();
    assert_eq!(shared_rows[0].ending_balance, money(-8000));

    let report = run_analysis(&mut dest, &by_category);
    let overdrawn = report.overdrawn.outcome.done().expect("overdrawn ran");
    assert_eq!(overdrawn[0].ending_balance, money(-5000));
    let overpaid = report.overpaid.outcome.done().expect("overpaid ran");
    assert_eq!(overpaid[0].ending_balance, money(-1000));
    assert_eq!(report.total_assets.outcome, Outcome::Done(money(-6000)));
}

#[test]
fn missing_relation_is_reported_and_remaining_queries_run() {
    let mut dest = memory_db();
    dest.execute_batch(
        "CREATE TABLE checking (account_id INTEGER, starting_balance NUMERIC);
         CREATE TABLE transactions (account_id INTEGER, amount NUMERIC);
         INSERT INTO checking VALUES (1, -3);",
    )
    .unwrap();
    let layout = ReportLayout::default();

    let report = run_analysis_with(&mut dest, &layout, &Attribution::SharedAccountId);

    assert_eq!(report.overdrawn.outcome.done().map(Vec::len), Some(1));
    assert!(
        report
            .overpaid
            .outcome
            .reason()
            .is_some_and(|reason| reason.contains("loans"))
    );
    assert!(!report.total_assets.outcome.is_done());
    assert_eq!(report.skipped(), 2);

    // The connection is still usable after the failed queries were rolled back.
    dest.execute_batch("INSERT INTO checking VALUES (2, 1)").unwrap();
}
