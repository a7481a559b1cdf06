//! # Storage Collaborators
//!
//! The engine reads and writes through three traits. Persistence technology
//! is the implementor's business: `hearth-db` provides SQLite, and
//! [`crate::memory::InMemoryStore`] backs tests and tools.
//!
//! ## Mutation Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Generated instances                                                    │
//! │    exists_standing_instance(t, d) ──► false ──► insert(instance)        │
//! │         (fast path)                              (constraint-guarded)   │
//! │                                                       │                 │
//! │                         UNIQUE(template_id, date) hit ▼                 │
//! │                              InsertOutcome::AlreadyMaterialized         │
//! │                                                                         │
//! │  Manual orders win, enforced inside the store                           │
//! │    insert(generated) with a manual order on (customer, date)            │
//! │        ──► InsertOutcome::ManualOrderExists (nothing written)           │
//! │    insert_manual_replacing(manual): delete generated + insert manual    │
//! │        as one unit, so no batch run can slip a row in between           │
//! │                                                                         │
//! │  Sequence numbers                                                       │
//! │    atomic_increment(key, floor): one indivisible step, never            │
//! │    read-then-write                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations must be `Send + Sync`; components hold them as
//! `Arc<dyn Trait>` and may be shared across tasks.

use async_trait::async_trait;
use chrono::NaiveDate;
use hearth_core::{OrderInstance, StandingOrderTemplate, TemplateStatus};

use crate::error::StoreResult;

// =============================================================================
// Template Store
// =============================================================================

/// Persistence for standing order templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// All templates with status `Active`.
    ///
    /// Rows that cannot be decoded are skipped by the implementation, so one
    /// corrupt template does not hide the rest.
    async fn list_active(&self) -> StoreResult<Vec<StandingOrderTemplate>>;

    /// Fetches a template by id.
    async fn get(&self, id: &str) -> StoreResult<Option<StandingOrderTemplate>>;

    /// Stores a new template.
    async fn insert(&self, template: &StandingOrderTemplate) -> StoreResult<()>;

    /// Overwrites an existing template (items, recurrence, duration, notes,
    /// status).
    async fn save(&self, template: &StandingOrderTemplate) -> StoreResult<()>;

    /// Sets the lifecycle status.
    async fn update_status(&self, id: &str, status: TemplateStatus) -> StoreResult<()>;

    /// Refreshes the advisory next-delivery date.
    async fn update_next_delivery(&self, id: &str, date: Option<NaiveDate>) -> StoreResult<()>;

    /// Removes a template record. Returns false when it did not exist.
    async fn delete(&self, id: &str) -> StoreResult<bool>;
}

// =============================================================================
// Order Store
// =============================================================================

/// Result of a constraint-guarded insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A generated instance for the same (template, date) already exists.
    AlreadyMaterialized,
    /// The customer has a manual order for that date; the generated
    /// instance was not written.
    ManualOrderExists,
}

/// Persistence for order instances.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// True when a generated instance exists for (template, date).
    async fn exists_standing_instance(&self, template_id: &str, date: NaiveDate)
        -> StoreResult<bool>;

    /// True when the customer has a manual order for `date`.
    async fn has_manual_instance(&self, customer_id: &str, date: NaiveDate) -> StoreResult<bool>;

    /// Inserts an instance with its lines, atomically.
    ///
    /// For a generated instance, a duplicate (template, date) returns
    /// `Ok(InsertOutcome::AlreadyMaterialized)` and a manual order on the
    /// same (customer, date) returns `Ok(InsertOutcome::ManualOrderExists)`.
    /// Both checks happen in the same atomic step as the write. A reused
    /// id or sequence number is `StoreError::Conflict`.
    async fn insert(&self, instance: &OrderInstance) -> StoreResult<InsertOutcome>;

    /// Inserts a manual instance and deletes every generated instance for
    /// its (customer, date) in one atomic step. Returns the number removed.
    ///
    /// A generated instance passed here is `StoreError::Conflict`.
    async fn insert_manual_replacing(&self, instance: &OrderInstance) -> StoreResult<u64>;

    /// Deletes the template's generated instances dated on or after `from`
    /// that are not yet fulfilled. Returns the number removed.
    async fn delete_future_standing_instances(
        &self,
        template_id: &str,
        from: NaiveDate,
    ) -> StoreResult<u64>;

    /// Deletes generated instances for (customer, date) across all templates.
    async fn delete_standing_instance_for(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> StoreResult<u64>;

    /// All instances generated from a template, ordered by delivery date.
    async fn instances_for_template(&self, template_id: &str) -> StoreResult<Vec<OrderInstance>>;

    /// All instances for a customer on a date, any origin.
    async fn instances_for_customer_on(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<OrderInstance>>;
}

// =============================================================================
// Counter Store
// =============================================================================

/// Named integer counters with an atomic increment.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increments `key` and returns the new value in one indivisible step.
    ///
    /// A missing counter starts at `floor`; an existing counter below
    /// `floor` jumps to `floor`. The result is always `>= floor`.
    async fn atomic_increment(&self, key: &str, floor: i64) -> StoreResult<i64>;

    /// Raises `key` to at least `value`, never lowering it. Returns the
    /// stored value afterwards.
    async fn raise_to(&self, key: &str, value: i64) -> StoreResult<i64>;

    /// Current value without incrementing.
    async fn current(&self, key: &str) -> StoreResult<Option<i64>>;
}
