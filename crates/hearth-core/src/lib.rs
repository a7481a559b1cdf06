//! # hearth-core: Pure Scheduling Logic for Hearth Wholesale
//!
//! This crate holds the date and recurrence rules of the ordering backend as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Hearth Wholesale Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP layer / cron trigger (out of this crate)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        hearth-schedule (materializer, sequence, overrides)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ hearth-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ delivery  │  │ recurrence │  │ validation│  │   │
//! │  │   │ Template  │  │ cutoff    │  │ weekly /   │  │  drafts   │  │   │
//! │  │   │ Instance  │  │ ref. zone │  │ interval   │  │  items    │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK READS • PURE FUNCTIONS       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (StandingOrderTemplate, OrderInstance, etc.)
//! - [`money`] - Money type with integer arithmetic (paise, no floating point)
//! - [`delivery`] - Submission instant → delivery calendar date
//! - [`recurrence`] - "Is an occurrence due on this date?"
//! - [`validation`] - Template and line-item validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use hearth_core::delivery::DeliveryDateResolver;
//!
//! let resolver = DeliveryDateResolver::new(4, chrono_tz::Asia::Kolkata).unwrap();
//!
//! // 22:00 UTC is 03:30 IST the next morning: still before the 04:00 cutoff
//! let submitted = Utc.with_ymd_and_hms(2024, 6, 2, 22, 0, 0).unwrap();
//! assert_eq!(
//!     resolver.resolve(submitted),
//!     NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod delivery;
pub mod error;
pub mod money;
pub mod recurrence;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use delivery::{DeliveryDateResolver, DeliveryEstimate};
pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use recurrence::is_due;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Reference zone for every delivery-date boundary.
///
/// The bakery operates in India; all observers must agree on the delivery
/// date regardless of device or server zone.
pub const DEFAULT_TIMEZONE: chrono_tz::Tz = chrono_tz::Asia::Kolkata;

/// Local hour at and after which a submission rolls to the next day.
pub const DEFAULT_CUTOFF_HOUR: u32 = 4;

/// Number of future days kept materialized for each standing order.
pub const DEFAULT_HORIZON_DAYS: u32 = 10;

/// Counter key used for order sequence numbers.
pub const ORDER_COUNTER_KEY: &str = "order_counter";

/// The first order number ever issued.
pub const ORDER_SEQUENCE_FLOOR: i64 = 101;

/// Maximum line items on a single standing order.
pub const MAX_TEMPLATE_ITEMS: usize = 100;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Wholesale orders run large, but a five-digit quantity is almost always a
/// typo.
pub const MAX_LINE_QUANTITY: i64 = 9_999;
