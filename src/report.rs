//! Account balance analysis.
//!
//! Every figure is derived the same way: an account's ending balance is its
//! starting value plus the signed sum of its ledger entries, with accounts
//! that have no entries kept (left outer join, zero contribution). Three
//! read-only queries build on that:
//!
//! - checking accounts whose ending balance is negative (overdrawn)
//! - loan accounts whose balance went below zero (paid beyond the debt)
//! - total asset size: all checking balances plus all loan balances
//!
//! Which ledger entries belong to which account category is decided by a
//! [`LedgerAttribution`]; the default matches on the account id alone.

use std::io::{self, Write};

use log::{debug, info, warn};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::{
    outcome::{Outcome, UnitReport},
    store::{Destination, QueryResult, SqlValue, StoreError, quote_identifier, quote_literal},
    table::{self, Align},
};

pub const OVERDRAWN_UNIT: &str = "overdrawn accounts";
pub const OVERPAID_UNIT: &str = "overpaid loans";
pub const TOTAL_ASSETS_UNIT: &str = "total asset size";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCategory {
    Checking,
    Loan,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountSource {
    pub table: String,
    pub id_column: String,
    pub starting_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerSource {
    pub table: String,
    pub account_column: String,
    pub amount_column: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attribution {
    /// Every ledger entry counts for whichever account carries its id.
    #[default]
    SharedAccountId,
    /// Ledger entries carry a category marker in `column`.
    CategoryColumn {
        column: String,
        checking: String,
        loan: String,
    },
}

pub trait LedgerAttribution {
    /// Predicate over the ledger table restricting entries to `category`.
    fn ledger_filter(&self, category: AccountCategory) -> Option<String>;
}

impl LedgerAttribution for Attribution {
    fn ledger_filter(&self, category: AccountCategory) -> Option<String> {
        match self {
            Attribution::SharedAccountId => None,
            Attribution::CategoryColumn {
                column,
                checking,
                loan,
            } => {
                let value = match category {
                    AccountCategory::Checking => checking,
                    AccountCategory::Loan => loan,
                };
                Some(format!(
                    "{} = {}",
                    quote_identifier(column),
                    quote_literal(value)
                ))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportLayout {
    pub checking: AccountSource,
    pub loans: AccountSource,
    pub ledger: LedgerSource,
    pub attribution: Attribution,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            checking: AccountSource {
                table: "checking".to_string(),
                id_column: "account_id".to_string(),
                starting_column: "starting_balance".to_string(),
            },
            loans: AccountSource {
                table: "loans".to_string(),
                id_column: "account_id".to_string(),
                starting_column: "starting_debt".to_string(),
            },
            ledger: LedgerSource {
                table: "transactions".to_string(),
                account_column: "account_id".to_string(),
                amount_column: "amount".to_string(),
            },
            attribution: Attribution::default(),
        }
    }
}

impl ReportLayout {
    fn account(&self, category: AccountCategory) -> &AccountSource {
        match category {
            AccountCategory::Checking => &self.checking,
            AccountCategory::Loan => &self.loans,
        }
    }

    /// One row per account of `category`:
    /// `account_id, starting_value, transaction_total, ending_balance`.
    pub fn balance_query(
        &self,
        category: AccountCategory,
        attribution: &dyn LedgerAttribution,
    ) -> String {
        let account = self.account(category);
        let ledger = &self.ledger;
        let id = quote_identifier(&account.id_column);
        let start = quote_identifier(&account.starting_column);
        let ledger_account = quote_identifier(&ledger.account_column);
        let filter = attribution
            .ledger_filter(category)
            .map(|predicate| format!(" WHERE {predicate}"))
            .unwrap_or_default();
        format!(
            "SELECT a.{id} AS account_id, a.{start} AS starting_value, \
             COALESCE(l.total, 0) AS transaction_total, \
             a.{start} + COALESCE(l.total, 0) AS ending_balance \
             FROM {accounts} a \
             LEFT JOIN (SELECT {ledger_account} AS account_id, SUM({amount}) AS total \
             FROM {ledger_table}{filter} GROUP BY {ledger_account}) l \
             ON l.account_id = a.{id}",
            accounts = quote_identifier(&account.table),
            amount = quote_identifier(&ledger.amount_column),
            ledger_table = quote_identifier(&ledger.table),
        )
    }

    pub fn negative_balance_query(
        &self,
        category: AccountCategory,
        attribution: &dyn LedgerAttribution,
    ) -> String {
        format!(
            "SELECT b.account_id, b.starting_value, b.transaction_total, b.ending_balance \
             FROM ({}) b WHERE b.ending_balance < 0 ORDER BY b.account_id",
            self.balance_query(category, attribution)
        )
    }

    pub fn total_assets_query(&self, attribution: &dyn LedgerAttribution) -> String {
        format!(
            "SELECT (SELECT COALESCE(SUM(c.ending_balance), 0) FROM ({}) c) \
             + (SELECT COALESCE(SUM(n.ending_balance), 0) FROM ({}) n) AS total_assets",
            self.balance_query(AccountCategory::Checking, attribution),
            self.balance_query(AccountCategory::Loan, attribution)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalanceRow {
    pub account_id: String,
    pub starting_value: Decimal,
    pub transaction_total: Decimal,
    pub ending_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub overdrawn: UnitReport<Vec<AccountBalanceRow>>,
    pub overpaid: UnitReport<Vec<AccountBalanceRow>>,
    pub total_assets: UnitReport<Decimal>,
}

impl AnalysisReport {
    pub fn skipped(&self) -> usize {
        [
            self.overdrawn.outcome.is_done(),
            self.overpaid.outcome.is_done(),
            self.total_assets.outcome.is_done(),
        ]
        .iter()
        .filter(|done| !**done)
        .count()
    }
}

pub fn money(value: Decimal) -> Decimal {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

fn decimal_at(result: &QueryResult, row: &[SqlValue], idx: usize) -> Result<Decimal, StoreError> {
    let column = result.columns.get(idx).map(String::as_str).unwrap_or("?");
    match row.get(idx) {
        Some(value) => Ok(money(value.to_decimal(column)?.unwrap_or_default())),
        None => Ok(Decimal::ZERO),
    }
}

fn balance_rows(result: &QueryResult) -> Result<Vec<AccountBalanceRow>, StoreError> {
    result
        .rows
        .iter()
        .map(|row| {
            Ok(AccountBalanceRow {
                account_id: row.first().map(|v| v.as_display()).unwrap_or_default(),
                starting_value: decimal_at(result, row, 1)?,
                transaction_total: decimal_at(result, row, 2)?,
                ending_balance: decimal_at(result, row, 3)?,
            })
        })
        .collect()
}

pub fn negative_balances<D>(
    dest: &mut D,
    layout: &ReportLayout,
    category: AccountCategory,
    attribution: &dyn LedgerAttribution,
) -> Result<Vec<AccountBalanceRow>, StoreError>
where
    D: Destination + ?Sized,
{
    let sql = layout.negative_balance_query(category, attribution);
    debug!("Running balance query: {sql}");
    let result = dest.query(&sql)?;
    // Stores that sum NUMERIC as floating point leave residues like -5e-17
    // that pass the SQL filter but round to 0.00.
    let rows = balance_rows(&result)?
        .into_iter()
        .filter(|row| row.ending_balance < Decimal::ZERO)
        .collect();
    Ok(rows)
}

pub fn overdrawn_accounts<D>(
    dest: &mut D,
    layout: &ReportLayout,
    attribution: &dyn LedgerAttribution,
) -> Result<Vec<AccountBalanceRow>, StoreError>
where
    D: Destination + ?Sized,
{
    negative_balances(dest, layout, AccountCategory::Checking, attribution)
}

pub fn overpaid_loans<D>(
    dest: &mut D,
    layout: &ReportLayout,
    attribution: &dyn LedgerAttribution,
) -> Result<Vec<AccountBalanceRow>, StoreError>
where
    D: Destination + ?Sized,
{
    negative_balances(dest, layout, AccountCategory::Loan, attribution)
}

pub fn total_asset_size<D>(
    dest: &mut D,
    layout: &ReportLayout,
    attribution: &dyn LedgerAttribution,
) -> Result<Decimal, StoreError>
where
    D: Destination + ?Sized,
{
    let sql = layout.total_assets_query(attribution);
    debug!("Running total assets query: {sql}");
    let result = dest.query(&sql)?;
    match result.rows.first() {
        Some(row) => decimal_at(&result, row, 0),
        None => Ok(Decimal::ZERO),
    }
}

/// Runs all three queries with the layout's own attribution rule.
pub fn run_analysis<D>(dest: &mut D, layout: &ReportLayout) -> AnalysisReport
where
    D: Destination + ?Sized,
{
    run_analysis_with(dest, layout, &layout.attribution)
}

/// Runs all three queries, each in its own transaction. A failing query is
/// rolled back and reported as skipped; the others still run.
pub fn run_analysis_with<D>(
    dest: &mut D,
    layout: &ReportLayout,
    attribution: &dyn LedgerAttribution,
) -> AnalysisReport
where
    D: Destination + ?Sized,
{
    let overdrawn = attempt(dest, OVERDRAWN_UNIT, |d| {
        overdrawn_accounts(d, layout, attribution)
    });
    let overpaid = attempt(dest, OVERPAID_UNIT, |d| overpaid_loans(d, layout, attribution));
    let total_assets = attempt(dest, TOTAL_ASSETS_UNIT, |d| {
        total_asset_size(d, layout, attribution)
    });
    AnalysisReport {
        overdrawn,
        overpaid,
        total_assets,
    }
}

fn in_transaction<D, T, F>(dest: &mut D, op: F) -> Result<T, StoreError>
where
    D: Destination + ?Sized,
    F: FnOnce(&mut D) -> Result<T, StoreError>,
{
    dest.begin()?;
    let value = op(dest)?;
    dest.commit()?;
    Ok(value)
}

fn attempt<D, T, F>(dest: &mut D, unit: &str, op: F) -> UnitReport<T>
where
    D: Destination + ?Sized,
    F: FnOnce(&mut D) -> Result<T, StoreError>,
{
    let result = in_transaction(dest, op);
    if let Err(err) = &result {
        warn!("Analysis query '{unit}' failed: {err}");
        if let Err(rollback_err) = dest.rollback() {
            debug!("Rollback after '{unit}' failed: {rollback_err}");
        }
    } else {
        info!("Analysis query '{unit}' completed");
    }
    UnitReport::new(unit, Outcome::from_result(result))
}

pub fn render_balances(rows: &[AccountBalanceRow]) -> String {
    let headers = [
        "account_id",
        "starting_value",
        "transaction_total",
        "ending_balance",
    ]
    .map(String::from);
    let cells = rows
        .iter()
        .map(|row| {
            vec![
                row.account_id.clone(),
                format!("{:.2}", row.starting_value),
                format!("{:.2}", row.transaction_total),
                format!("{:.2}", row.ending_balance),
            ]
        })
        .collect::<Vec<_>>();
    table::render_table(
        &headers,
        &cells,
        &[Align::Left, Align::Right, Align::Right, Align::Right],
    )
}

pub fn write_report<W: Write>(out: &mut W, report: &AnalysisReport) -> io::Result<()> {
    for unit in [&report.overdrawn, &report.overpaid] {
        match &unit.outcome {
            Outcome::Done(rows) if rows.is_empty() => writeln!(out, "No {} found.\n", unit.unit)?,
            Outcome::Done(rows) => {
                writeln!(out, "{} ({}):", capitalize(&unit.unit), rows.len())?;
                writeln!(out, "{}", render_balances(rows))?;
            }
            Outcome::Skipped(reason) => {
                writeln!(out, "{} unavailable: {reason}\n", capitalize(&unit.unit))?
            }
        }
    }
    match &report.total_assets.outcome {
        Outcome::Done(total) => writeln!(out, "Total asset size: {total:.2}"),
        Outcome::Skipped(reason) => writeln!(out, "Total asset size unavailable: {reason}"),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
