//! # Recurrence Evaluation
//!
//! Decides whether a standing order is due on a given calendar date.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WeeklyDays {Mon, Wed, Fri}                                             │
//! │    Mon Tue Wed Thu Fri Sat Sun                                          │
//! │     ✓   ·   ✓   ·   ✓   ·   ·                                           │
//! │                                                                         │
//! │  Interval { every_n_days: 3 }, created on day 0                         │
//! │    d0  d1  d2  d3  d4  d5  d6  d7  d8  d9                               │
//! │     ·   ·   ·   ✓   ·   ·   ✓   ·   ·   ✓   (offset 0 never matches)    │
//! │                                                                         │
//! │  EndDate { d }: anything after d is never due, whatever the shape       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Degenerate descriptors (empty weekday set, interval <= 0) are not errors.
//! They just never match.

use chrono::{Datelike, NaiveDate};

use crate::delivery::next_day;
use crate::types::{Recurrence, TemplateDuration};

/// Returns true when an occurrence is due on `candidate`.
///
/// `created` is the template's creation date in the reference zone.
pub fn is_due(
    recurrence: &Recurrence,
    candidate: NaiveDate,
    created: NaiveDate,
    duration: &TemplateDuration,
) -> bool {
    if let Some(end) = duration.end_date() {
        if candidate > end {
            return false;
        }
    }

    match recurrence {
        Recurrence::WeeklyDays { days } => days.contains(candidate.weekday()),
        Recurrence::Interval { every_n_days } => {
            if *every_n_days <= 0 {
                return false;
            }
            let offset = (candidate - created).num_days();
            offset > 0 && offset % every_n_days == 0
        }
    }
}

/// Due dates in the window `[from, from + days)`, in order.
pub fn due_dates(
    recurrence: &Recurrence,
    created: NaiveDate,
    duration: &TemplateDuration,
    from: NaiveDate,
    days: u32,
) -> Vec<NaiveDate> {
    horizon(from, days)
        .filter(|d| is_due(recurrence, *d, created, duration))
        .collect()
}

/// Iterates `days` consecutive dates starting at `from`.
pub fn horizon(from: NaiveDate, days: u32) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(from), |d| Some(next_day(*d))).take(days as usize)
}

// =============================================================================
// Unit Tests
// =============================================================================
