//! Test fixtures and fault-injecting store wrappers.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;
use hearth_core::{
    price_lines, LineItem, Money, OrderInstance, OrderOrigin, OrderStatus, PaymentStatus,
    Recurrence, StandingOrderTemplate, TemplateDuration, TemplateStatus,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryStore;
use crate::store::{CounterStore, InsertOutcome, OrderStore, TemplateStore};

// =============================================================================
// Fixtures
// =============================================================================

/// An instant given as IST wall-clock time.
pub fn ist(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Kolkata
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn items() -> Vec<LineItem> {
    vec![
        LineItem::new("bun", "Milk Bun", 12, Money::from_paise(1500)),
        LineItem::new("rusk", "Rusk 200g", 3, Money::from_paise(4500)),
    ]
}

/// Active Mon/Wed/Fri template created Saturday 2024-06-01 10:00 IST.
pub fn template(id: &str, customer_id: &str) -> StandingOrderTemplate {
    StandingOrderTemplate {
        id: id.to_string(),
        customer_id: customer_id.to_string(),
        items: items(),
        recurrence: Recurrence::weekly([0, 2, 4]),
        duration: TemplateDuration::Indefinite,
        status: TemplateStatus::Active,
        notes: None,
        created_at: ist(2024, 6, 1, 10, 0),
        created_by: "admin".to_string(),
        next_delivery_date: None,
    }
}

pub fn instance(
    customer_id: &str,
    delivery_date: NaiveDate,
    origin: OrderOrigin,
    sequence_number: i64,
) -> OrderInstance {
    let (lines, total_amount) = price_lines(&items()).unwrap();
    OrderInstance {
        id: uuid::Uuid::new_v4().to_string(),
        sequence_number,
        customer_id: customer_id.to_string(),
        lines,
        total_amount,
        delivery_date,
        status: OrderStatus::Confirmed,
        origin,
        payment_status: PaymentStatus::Pending,
        notes: None,
        created_at: ist(2024, 6, 1, 10, 0),
    }
}

// =============================================================================
// Fault Injection
// =============================================================================

/// Wraps an [`InMemoryStore`] and fails or misbehaves on demand.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: Arc<InMemoryStore>,
    /// Every counter call fails with `Unavailable`.
    pub counters_down: AtomicBool,
    /// Order calls touching these templates fail with `Unavailable`.
    pub broken_templates: Mutex<HashSet<String>>,
    /// `exists_standing_instance` always answers false, so the next insert
    /// has to rely on the uniqueness guard.
    pub blind_existence_check: AtomicBool,
    /// `update_status` fails with `Unavailable`.
    pub status_updates_down: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn break_template(&self, id: &str) {
        self.broken_templates.lock().unwrap().insert(id.to_string());
    }

    fn check_template(&self, id: &str) -> StoreResult<()> {
        if self.broken_templates.lock().unwrap().contains(id) {
            return Err(StoreError::Unavailable(format!("injected fault for {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for FaultyStore {
    async fn list_active(&self) -> StoreResult<Vec<StandingOrderTemplate>> {
        self.inner.list_active().await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<StandingOrderTemplate>> {
        self.inner.get(id).await
    }

    async fn insert(&self, template: &StandingOrderTemplate) -> StoreResult<()> {
        TemplateStore::insert(self.inner.as_ref(), template).await
    }

    async fn save(&self, template: &StandingOrderTemplate) -> StoreResult<()> {
        self.inner.save(template).await
    }

    async fn update_status(&self, id: &str, status: TemplateStatus) -> StoreResult<()> {
        if self.status_updates_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("status updates down".into()));
        }
        self.inner.update_status(id, status).await
    }

    async fn update_next_delivery(&self, id: &str, date: Option<NaiveDate>) -> StoreResult<()> {
        self.inner.update_next_delivery(id, date).await
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl OrderStore for FaultyStore {
    async fn exists_standing_instance(
        &self,
        template_id: &str,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        self.check_template(template_id)?;
        if self.blind_existence_check.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.exists_standing_instance(template_id, date).await
    }

    async fn has_manual_instance(&self, customer_id: &str, date: NaiveDate) -> StoreResult<bool> {
        self.inner.has_manual_instance(customer_id, date).await
    }

    async fn insert(&self, instance: &OrderInstance) -> StoreResult<InsertOutcome> {
        if let Some(template_id) = instance.template_id() {
            self.check_template(template_id)?;
        }
        OrderStore::insert(self.inner.as_ref(), instance).await
    }

    async fn insert_manual_replacing(&self, instance: &OrderInstance) -> StoreResult<u64> {
        self.inner.insert_manual_replacing(instance).await
    }

    async fn delete_future_standing_instances(
        &self,
        template_id: &str,
        from: NaiveDate,
    ) -> StoreResult<u64> {
        self.check_template(template_id)?;
        self.inner
            .delete_future_standing_instances(template_id, from)
            .await
    }

    async fn delete_standing_instance_for(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> StoreResult<u64> {
        self.inner.delete_standing_instance_for(customer_id, date).await
    }

    async fn instances_for_template(&self, template_id: &str) -> StoreResult<Vec<OrderInstance>> {
        self.inner.instances_for_template(template_id).await
    }

    async fn instances_for_customer_on(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<OrderInstance>> {
        self.inner.instances_for_customer_on(customer_id, date).await
    }
}

#[async_trait]
impl CounterStore for FaultyStore {
    async fn atomic_increment(&self, key: &str, floor: i64) -> StoreResult<i64> {
        if self.counters_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("counter store down".into()));
        }
        self.inner.atomic_increment(key, floor).await
    }

    async fn raise_to(&self, key: &str, value: i64) -> StoreResult<i64> {
        self.inner.raise_to(key, value).await
    }

    async fn current(&self, key: &str) -> StoreResult<Option<i64>> {
        self.inner.current(key).await
    }
}
