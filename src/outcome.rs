//! Per-unit results for work that continues past individual failures.
//!
//! Table creation, row insertion and the analysis queries each run as a
//! series of independent units. A failing unit is recorded as skipped with
//! its cause and the run moves on, so callers (and tests) can count what
//! happened instead of scraping log output.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    Done(T),
    Skipped(String),
}

impl<T> Outcome<T> {
    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Done(value),
            Err(err) => Outcome::Skipped(err.to_string()),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn done(&self) -> Option<&T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Skipped(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Done(_) => None,
            Outcome::Skipped(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport<T = ()> {
    pub unit: String,
    pub outcome: Outcome<T>,
}

impl<T> UnitReport<T> {
    pub fn new(unit: impl Into<String>, outcome: Outcome<T>) -> Self {
        Self {
            unit: unit.into(),
            outcome,
        }
    }
}

/// Counts completed and skipped units in a batch of reports.
pub fn tally<T>(reports: &[UnitReport<T>]) -> (usize, usize) {
    let done = reports.iter().filter(|r| r.outcome.is_done()).count();
    (done, reports.len() - done)
}
