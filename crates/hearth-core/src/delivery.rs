//! # Delivery Date Resolution
//!
//! Maps the instant an order is submitted to the calendar date it is due.
//!
//! ## The Cutoff Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            Submission → Delivery Date (cutoff = 04:00 IST)              │
//! │                                                                         │
//! │   Mon 00:00        Mon 04:00                         Tue 00:00          │
//! │      │─── same day ───│──────────── next day ───────────│               │
//! │      │  deliver Mon   │           deliver Tue            │               │
//! │                                                                         │
//! │   03:59 → Monday       04:00 → Tuesday (boundary rolls forward)         │
//! │                                                                         │
//! │   The instant is converted into the REFERENCE zone first. A phone in   │
//! │   Dubai and a server in Frankfurt see the same date as the bakery.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unparseable instants never get here; the HTTP layer rejects them.

use chrono::{DateTime, Days, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Resolver
// =============================================================================

/// Resolves delivery dates against a fixed cutoff hour and reference zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryDateResolver {
    cutoff_hour: u32,
    zone: Tz,
}

impl DeliveryDateResolver {
    /// Creates a resolver.
    ///
    /// ## Errors
    /// `CoreError::InvalidCutoffHour` when `cutoff_hour > 23`.
    pub fn new(cutoff_hour: u32, zone: Tz) -> CoreResult<Self> {
        if cutoff_hour > 23 {
            return Err(CoreError::InvalidCutoffHour(cutoff_hour));
        }
        Ok(DeliveryDateResolver { cutoff_hour, zone })
    }

    /// Creates a resolver from an IANA zone name such as `Asia/Kolkata`.
    pub fn from_zone_name(cutoff_hour: u32, zone_name: &str) -> CoreResult<Self> {
        Self::new(cutoff_hour, parse_zone(zone_name)?)
    }

    #[inline]
    pub fn cutoff_hour(&self) -> u32 {
        self.cutoff_hour
    }

    #[inline]
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Delivery date for an order submitted at `instant`.
    pub fn resolve(&self, instant: DateTime<Utc>) -> NaiveDate {
        resolve_delivery_date(instant, self.cutoff_hour, self.zone)
    }

    /// Local calendar date of `now` in the reference zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.zone).date_naive()
    }

    /// The day after [`today`](Self::today): first day of a materialization
    /// horizon.
    pub fn tomorrow(&self, now: DateTime<Utc>) -> NaiveDate {
        next_day(self.today(now))
    }

    /// Resolves and builds the display descriptor.
    pub fn describe(&self, instant: DateTime<Utc>) -> DeliveryEstimate {
        let local = instant.with_timezone(&self.zone);
        let delivery_date = self.resolve(instant);
        let is_same_day = delivery_date == local.date_naive();
        let day_name = delivery_date.format("%A").to_string();

        let cutoff_message = if is_same_day {
            format!(
                "Orders placed before {:02}:00 are delivered the same day ({})",
                self.cutoff_hour, day_name
            )
        } else {
            format!(
                "Orders placed from {:02}:00 onwards are delivered the next day ({})",
                self.cutoff_hour, day_name
            )
        };

        DeliveryEstimate {
            delivery_date,
            formatted_date: delivery_date.format("%A, %d %B %Y").to_string(),
            day_name,
            is_same_day,
            cutoff_message,
            local_time: local.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        }
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Human-readable view of a resolved delivery date.
///
/// Derived for display; `delivery_date` is the only authoritative field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryEstimate {
    #[ts(as = "String")]
    pub delivery_date: NaiveDate,
    /// e.g. "Tuesday, 04 June 2024"
    pub formatted_date: String,
    pub day_name: String,
    pub is_same_day: bool,
    pub cutoff_message: String,
    /// Submission time in the reference zone.
    pub local_time: String,
}

// =============================================================================
// Free Functions
// =============================================================================

/// Applies the cutoff rule.
///
/// Local hour `< cutoff_hour` → same local date; `>= cutoff_hour` → next date.
pub fn resolve_delivery_date(instant: DateTime<Utc>, cutoff_hour: u32, zone: Tz) -> NaiveDate {
    let local = instant.with_timezone(&zone);
    let date = local.date_naive();

    if local.hour() < cutoff_hour {
        date
    } else {
        next_day(date)
    }
}

/// Parses an IANA zone name.
pub fn parse_zone(name: &str) -> CoreResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| CoreError::UnknownTimezone(name.to_string()))
}

/// The following calendar date (saturates at the end of chrono's range).
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

// =============================================================================
// Unit Tests
// =============================================================================
