//! # Domain Types
//!
//! Core domain types for standing orders and the order instances they
//! produce.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐        materialize        ┌─────────────────┐│
//! │  │ StandingOrderTemplate│ ─────────────────────────►│  OrderInstance  ││
//! │  │  ──────────────────  │   one per due date        │  ─────────────  ││
//! │  │  items: [LineItem]   │                           │  sequence_number││
//! │  │  recurrence          │                           │  lines/subtotal ││
//! │  │  duration            │                           │  delivery_date  ││
//! │  │  status              │                           │  origin         ││
//! │  └──────────────────────┘                           └─────────────────┘│
//! │                                                                         │
//! │  Recurrence           TemplateDuration      OrderOrigin                 │
//! │  ├── WeeklyDays       ├── EndDate           ├── Manual                  │
//! │  └── Interval         └── Indefinite        └── StandingGenerated       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! - `id`: UUID v4 string, immutable, used for relations
//! - `sequence_number`: human-facing order number, strictly increasing

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Weekday Set
// =============================================================================

/// A set of weekdays, stored as a bitmask.
///
/// ## Encoding
/// Index 0 = Monday … 6 = Sunday, the same numbering the admin app sends.
/// Serialized as a JSON array of indices: `[0, 2, 4]` = Mon, Wed, Fri.
///
/// Indices outside 0..=6 are dropped on decode, so a stored set made only of
/// garbage becomes empty and simply never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<i64>", into = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// The empty set.
    pub const fn empty() -> Self {
        WeekdaySet(0)
    }

    /// Builds a set from Monday-based indices, ignoring out-of-range values.
    pub fn from_indices<I>(indices: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let mut set = WeekdaySet::empty();
        for idx in indices {
            if (0..7).contains(&idx) {
                set.0 |= 1 << idx;
            }
        }
        set
    }

    /// Builds a set from chrono weekdays.
    pub fn from_weekdays<I>(days: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        let mut set = WeekdaySet::empty();
        for day in days {
            set.insert(day);
        }
        set
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Monday-based indices in ascending order.
    pub fn indices(&self) -> Vec<u8> {
        (0u8..7).filter(|i| self.0 & (1 << i) != 0).collect()
    }
}

impl From<Vec<i64>> for WeekdaySet {
    fn from(indices: Vec<i64>) -> Self {
        WeekdaySet::from_indices(indices)
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.indices()
    }
}

// =============================================================================
// Recurrence Descriptor
// =============================================================================

/// How often a standing order produces an instance.
///
/// A closed set of shapes: the evaluator matches exhaustively, so a new
/// shape cannot be silently mis-handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Due on each listed weekday.
    WeeklyDays {
        #[ts(as = "Vec<u8>")]
        days: WeekdaySet,
    },

    /// Due every N days counted from the template's creation date.
    ///
    /// Stored as signed so a corrupt zero or negative value can be carried
    /// to the evaluator, which treats it as "never due".
    Interval { every_n_days: i64 },
}

impl Recurrence {
    /// Monday/Wednesday/Friday style recurrence from weekday indices.
    pub fn weekly<I>(indices: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Recurrence::WeeklyDays {
            days: WeekdaySet::from_indices(indices),
        }
    }

    pub fn every(days: i64) -> Self {
        Recurrence::Interval { every_n_days: days }
    }

    /// Short tag used in logs and storage.
    pub fn kind(&self) -> &'static str {
        match self {
            Recurrence::WeeklyDays { .. } => "weekly_days",
            Recurrence::Interval { .. } => "interval",
        }
    }

    /// Returns true when this descriptor can never produce an occurrence.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Recurrence::WeeklyDays { days } => days.is_empty(),
            Recurrence::Interval { every_n_days } => *every_n_days <= 0,
        }
    }
}

// =============================================================================
// Template Duration
// =============================================================================

/// How long a standing order keeps producing instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateDuration {
    /// Last delivery date (inclusive).
    EndDate {
        #[ts(as = "String")]
        date: NaiveDate,
    },
    /// Runs until cancelled.
    Indefinite,
}

impl TemplateDuration {
    /// Returns the inclusive end date, if any.
    pub fn end_date(&self) -> Option<NaiveDate> {
        match self {
            TemplateDuration::EndDate { date } => Some(*date),
            TemplateDuration::Indefinite => None,
        }
    }
}

// =============================================================================
// Template Status
// =============================================================================

/// Lifecycle state of a standing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    /// Producing instances.
    #[default]
    Active,
    /// Stopped by an admin; future instances removed.
    Cancelled,
    /// End date passed.
    Completed,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Active => "active",
            TemplateStatus::Cancelled => "cancelled",
            TemplateStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// A product line on a standing order or order request (price frozen).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    /// Product name at time of ordering (snapshot).
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineItem {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
    ) -> Self {
        LineItem {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }
}

/// A priced line on an order instance.
///
/// Reporting reads `product_id`, `quantity`, `unit_price` and `subtotal`
/// straight off this type, so all four are always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// `quantity × unit_price`.
    pub subtotal: Money,
}

impl OrderLine {
    /// Prices a single line item.
    pub fn from_item(item: &LineItem) -> CoreResult<Self> {
        let subtotal = item.unit_price.multiply_quantity(item.quantity).ok_or_else(|| {
            CoreError::AmountOverflow {
                product_id: item.product_id.clone(),
            }
        })?;

        Ok(OrderLine {
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal,
        })
    }
}

/// Prices every line and sums the instance total.
pub fn price_lines(items: &[LineItem]) -> CoreResult<(Vec<OrderLine>, Money)> {
    let mut lines = Vec::with_capacity(items.len());
    let mut total = Money::zero();

    for item in items {
        let line = OrderLine::from_item(item)?;
        total = total
            .checked_add(line.subtotal)
            .ok_or_else(|| CoreError::AmountOverflow {
                product_id: item.product_id.clone(),
            })?;
        lines.push(line);
    }

    Ok((lines, total))
}

// =============================================================================
// Standing Order Template
// =============================================================================

/// An admin-defined recurring order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StandingOrderTemplate {
    pub id: String,
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub recurrence: Recurrence,
    pub duration: TemplateDuration,
    pub status: TemplateStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Username of the admin who created it.
    pub created_by: String,
    /// Advisory only; never used for scheduling decisions.
    #[ts(as = "Option<String>")]
    pub next_delivery_date: Option<NaiveDate>,
}

impl StandingOrderTemplate {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == TemplateStatus::Active
    }

    /// Calendar date of creation in the reference zone.
    ///
    /// Interval recurrences count days from here.
    pub fn created_date(&self, zone: Tz) -> NaiveDate {
        self.created_at.with_timezone(&zone).date_naive()
    }

    /// True when the template has an end date strictly before `today`.
    pub fn has_ended(&self, today: NaiveDate) -> bool {
        self.duration.end_date().is_some_and(|end| end < today)
    }
}

/// Input for creating a standing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TemplateDraft {
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub recurrence: Recurrence,
    pub duration: TemplateDuration,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update for a standing order. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TemplatePatch {
    #[serde(default)]
    pub items: Option<Vec<LineItem>>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub duration: Option<TemplateDuration>,
    /// New notes. A blank string clears them.
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<TemplateStatus>,
}

impl TemplatePatch {
    /// True when the patch changes what or when the template delivers.
    pub fn changes_schedule(&self) -> bool {
        self.items.is_some() || self.recurrence.is_some() || self.duration.is_some()
    }

    /// The notes to store: `None` leaves them untouched, `Some(None)` clears
    /// them.
    pub fn notes_update(&self) -> Option<Option<String>> {
        self.notes
            .as_deref()
            .map(|notes| Some(notes.trim()).filter(|n| !n.is_empty()).map(str::to_string))
    }
}

// =============================================================================
// Order Instance
// =============================================================================

/// Where an order instance came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderOrigin {
    /// Submitted by the customer.
    Manual,
    /// Produced by the standing-order engine.
    StandingGenerated { template_id: String },
}

impl OrderOrigin {
    pub fn standing(template_id: impl Into<String>) -> Self {
        OrderOrigin::StandingGenerated {
            template_id: template_id.into(),
        }
    }

    pub fn template_id(&self) -> Option<&str> {
        match self {
            OrderOrigin::Manual => None,
            OrderOrigin::StandingGenerated { template_id } => Some(template_id),
        }
    }

    #[inline]
    pub fn is_standing(&self) -> bool {
        matches!(self, OrderOrigin::StandingGenerated { .. })
    }
}

/// Fulfilment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Delivered orders are history and are never deleted by the engine.
    #[inline]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }
}

/// Payment state. Opaque to scheduling; carried for the payment layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// A concrete, dated order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderInstance {
    pub id: String,
    /// From the sequence allocator. Unique and increasing system-wide.
    pub sequence_number: i64,
    pub customer_id: String,
    pub lines: Vec<OrderLine>,
    /// Sum of line subtotals.
    pub total_amount: Money,
    /// Calendar date in the reference zone.
    #[ts(as = "String")]
    pub delivery_date: NaiveDate,
    pub status: OrderStatus,
    pub origin: OrderOrigin,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderInstance {
    /// Display form of the sequence number, e.g. `ORD-000101`.
    pub fn order_number(&self) -> String {
        format!("ORD-{:06}", self.sequence_number)
    }

    /// Back-reference to the generating template, if any.
    pub fn template_id(&self) -> Option<&str> {
        self.origin.template_id()
    }
}

/// A customer's manual order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ManualOrderRequest {
    pub customer_id: String,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
