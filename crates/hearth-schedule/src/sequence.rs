//! # Sequence Allocator
//!
//! Issues order numbers that are unique and strictly increasing across the
//! whole system, including across process restarts.
//!
//! ## Why the Store Does the Increment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  READ-THEN-WRITE (broken)              ATOMIC INCREMENT (what we do)    │
//! │                                                                         │
//! │  A: read 117                           A: increment → 118               │
//! │  B: read 117                           B: increment → 119               │
//! │  A: write 118                                                           │
//! │  B: write 118   ❌ duplicate           ✓ distinct, ordered              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! When the counter store is unreachable the call fails. There is no local
//! fallback numbering: a guessed number could collide with one the store
//! already issued.

use hearth_core::{ORDER_COUNTER_KEY, ORDER_SEQUENCE_FLOOR};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::SequenceSettings;
use crate::error::ScheduleResult;
use crate::store::CounterStore;

/// Allocates sequence numbers from a [`CounterStore`].
pub struct SequenceAllocator {
    counters: Arc<dyn CounterStore>,
    counter_key: String,
    floor: i64,
    /// Highest value this process has handed out for `counter_key`.
    high_water: AtomicI64,
}

impl SequenceAllocator {
    pub fn new(counters: Arc<dyn CounterStore>, counter_key: impl Into<String>, floor: i64) -> Self {
        SequenceAllocator {
            counters,
            counter_key: counter_key.into(),
            floor,
            high_water: AtomicI64::new(0),
        }
    }

    /// Allocator for order numbers with the stock key and floor.
    pub fn for_orders(counters: Arc<dyn CounterStore>) -> Self {
        Self::new(counters, ORDER_COUNTER_KEY, ORDER_SEQUENCE_FLOOR)
    }

    pub fn from_settings(counters: Arc<dyn CounterStore>, settings: &SequenceSettings) -> Self {
        Self::new(counters, settings.counter_key.clone(), settings.floor)
    }

    /// Next order number from the configured counter.
    pub async fn next(&self) -> ScheduleResult<i64> {
        let value = self.next_for(&self.counter_key, self.floor).await?;
        self.high_water.fetch_max(value, Ordering::SeqCst);
        Ok(value)
    }

    /// Next value for an arbitrary counter.
    ///
    /// The result is strictly greater than anything previously returned for
    /// `counter_key`, and at least `floor`.
    pub async fn next_for(&self, counter_key: &str, floor: i64) -> ScheduleResult<i64> {
        match self.counters.atomic_increment(counter_key, floor).await {
            Ok(value) => {
                debug!(counter = counter_key, value, "Allocated sequence number");
                Ok(value)
            }
            Err(e) => {
                error!(counter = counter_key, error = %e, "Sequence allocation failed");
                Err(e.into())
            }
        }
    }

    /// Raises the stored counter so the next allocation is at least `floor`.
    ///
    /// Never lowers an existing counter. Returns the stored value.
    pub async fn initialize(&self) -> ScheduleResult<i64> {
        let value = self
            .counters
            .raise_to(&self.counter_key, self.floor - 1)
            .await?;
        info!(counter = %self.counter_key, value, "Order counter initialized");
        Ok(value)
    }

    /// Highest number this allocator has issued in this process (0 if none).
    pub fn high_water_mark(&self) -> i64 {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn counter_key(&self) -> &str {
        &self.counter_key
    }

    pub fn floor(&self) -> i64 {
        self.floor
    }
}
