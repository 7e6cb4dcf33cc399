// ⚖️ Date-Range Reconciliation
// Which calendar days appear in BOTH date columns, and what interval do they span?
//
// Used to check that a bank statement and the cash ledger cover the same days:
//   compararFechas(rango1; rango2) → "01/03/2025 - 28/03/2025"

use crate::sheet::Cell;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Error tags; the messages are what the sheet shows in the result cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum OverlapError {
    /// One of the ranges was not given at all
    #[error("Rangos vacíos")]
    EmptyRanges,

    /// One of the ranges holds no date cells
    #[error("Sin fechas válidas")]
    NoValidDates,

    /// Both ranges have dates but share none
    #[error("Sin coincidencias")]
    NoMatches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

/// Calendar days of every date cell in the range; everything else is dropped
fn calendar_days(range: &[Vec<Cell>]) -> BTreeSet<NaiveDate> {
    range.iter().flatten().filter_map(Cell::as_date).collect()
}

/// Earliest and latest day present in both ranges.
///
/// Days are compared exactly (time of day ignored), never by proximity.
/// The answer does not depend on the order of the cells.
pub fn overlap_range(
    a: Option<&[Vec<Cell>]>,
    b: Option<&[Vec<Cell>]>,
) -> Result<DateInterval, OverlapError> {
    let (Some(a), Some(b)) = (a, b) else {
        return Err(OverlapError::EmptyRanges);
    };

    let days_a = calendar_days(a);
    let days_b = calendar_days(b);
    if days_a.is_empty() || days_b.is_empty() {
        return Err(OverlapError::NoValidDates);
    }

    let mut shared = days_a.intersection(&days_b);
    let start = *shared.next().ok_or(OverlapError::NoMatches)?;
    let end = shared.last().copied().unwrap_or(start);

    log::debug!(
        "overlap {} ({} days in A, {} in B)",
        start,
        days_a.len(),
        days_b.len()
    );

    Ok(DateInterval { start, end })
}

// ============================================================================
// TESTS
// ============================================================================
