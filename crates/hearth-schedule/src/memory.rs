//! # In-Memory Store
//!
//! A reference implementation of every storage trait, backed by a single
//! `tokio::sync::Mutex`. Used by tests, and by tools that want to preview
//! what the engine would generate without touching a database.
//!
//! The lock is held across each trait call, so every check an insert makes
//! happens in the same step as the write. The rules match the SQLite schema:
//!
//! - order id and sequence number are unique across all instances
//! - one generated instance per (template, date)
//! - no generated instance next to a manual order for (customer, date)

use async_trait::async_trait;
use chrono::NaiveDate;
use hearth_core::{OrderInstance, OrderOrigin, StandingOrderTemplate, TemplateStatus};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::store::{CounterStore, InsertOutcome, OrderStore, TemplateStore};

#[derive(Debug, Default)]
struct State {
    templates: BTreeMap<String, StandingOrderTemplate>,
    orders: Vec<OrderInstance>,
    counters: HashMap<String, i64>,
}

/// Mutex-guarded store implementing all three storage traits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored order instance.
    pub async fn all_orders(&self) -> Vec<OrderInstance> {
        self.state.lock().await.orders.clone()
    }

    /// Snapshot of every stored template, any status.
    pub async fn all_templates(&self) -> Vec<StandingOrderTemplate> {
        self.state.lock().await.templates.values().cloned().collect()
    }
}

// =============================================================================
// Template Store
// =============================================================================

#[async_trait]
impl TemplateStore for InMemoryStore {
    async fn list_active(&self) -> StoreResult<Vec<StandingOrderTemplate>> {
        let state = self.state.lock().await;
        Ok(state
            .templates
            .values()
            .filter(|t| t.is_active())
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<StandingOrderTemplate>> {
        Ok(self.state.lock().await.templates.get(id).cloned())
    }

    async fn insert(&self, template: &StandingOrderTemplate) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.templates.contains_key(&template.id) {
            return Err(StoreError::Conflict(format!(
                "template {} already exists",
                template.id
            )));
        }
        state
            .templates
            .insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn save(&self, template: &StandingOrderTemplate) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        match state.templates.get_mut(&template.id) {
            Some(existing) => {
                *existing = template.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("template", &template.id)),
        }
    }

    async fn update_status(&self, id: &str, status: TemplateStatus) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let template = state
            .templates
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("template", id))?;
        template.status = status;
        Ok(())
    }

    async fn update_next_delivery(&self, id: &str, date: Option<NaiveDate>) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let template = state
            .templates
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("template", id))?;
        template.next_delivery_date = date;
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.state.lock().await.templates.remove(id).is_some())
    }
}

// =============================================================================
// Order Store
// =============================================================================

fn is_standing_for(order: &OrderInstance, template_id: &str) -> bool {
    order.template_id() == Some(template_id)
}

fn is_manual_on(order: &OrderInstance, customer_id: &str, date: NaiveDate) -> bool {
    order.origin == OrderOrigin::Manual
        && order.customer_id == customer_id
        && order.delivery_date == date
}

impl State {
    fn check_identity(&self, instance: &OrderInstance) -> StoreResult<()> {
        if self.orders.iter().any(|o| o.id == instance.id) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                instance.id
            )));
        }
        if self
            .orders
            .iter()
            .any(|o| o.sequence_number == instance.sequence_number)
        {
            return Err(StoreError::Conflict(format!(
                "sequence number {} already used",
                instance.sequence_number
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn exists_standing_instance(
        &self,
        template_id: &str,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .any(|o| is_standing_for(o, template_id) && o.delivery_date == date))
    }

    async fn has_manual_instance(&self, customer_id: &str, date: NaiveDate) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .any(|o| is_manual_on(o, customer_id, date)))
    }

    async fn insert(&self, instance: &OrderInstance) -> StoreResult<InsertOutcome> {
        let mut state = self.state.lock().await;

        if let Some(template_id) = instance.template_id() {
            let duplicate = state.orders.iter().any(|o| {
                is_standing_for(o, template_id) && o.delivery_date == instance.delivery_date
            });
            if duplicate {
                return Ok(InsertOutcome::AlreadyMaterialized);
            }

            let manual = state
                .orders
                .iter()
                .any(|o| is_manual_on(o, &instance.customer_id, instance.delivery_date));
            if manual {
                return Ok(InsertOutcome::ManualOrderExists);
            }
        }

        state.check_identity(instance)?;
        state.orders.push(instance.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn insert_manual_replacing(&self, instance: &OrderInstance) -> StoreResult<u64> {
        if instance.origin.is_standing() {
            return Err(StoreError::Conflict(format!(
                "order {} is not a manual order",
                instance.id
            )));
        }

        let mut state = self.state.lock().await;
        state.check_identity(instance)?;

        let before = state.orders.len();
        state.orders.retain(|o| {
            !(o.origin.is_standing()
                && o.customer_id == instance.customer_id
                && o.delivery_date == instance.delivery_date)
        });
        let removed = (before - state.orders.len()) as u64;

        state.orders.push(instance.clone());
        Ok(removed)
    }

    async fn delete_future_standing_instances(
        &self,
        template_id: &str,
        from: NaiveDate,
    ) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.orders.len();
        state.orders.retain(|o| {
            !(is_standing_for(o, template_id)
                && o.delivery_date >= from
                && !o.status.is_fulfilled())
        });
        Ok((before - state.orders.len()) as u64)
    }

    async fn delete_standing_instance_for(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.orders.len();
        state.orders.retain(|o| {
            !(o.origin.is_standing() && o.customer_id == customer_id && o.delivery_date == date)
        });
        Ok((before - state.orders.len()) as u64)
    }

    async fn instances_for_template(&self, template_id: &str) -> StoreResult<Vec<OrderInstance>> {
        let state = self.state.lock().await;
        let mut found: Vec<OrderInstance> = state
            .orders
            .iter()
            .filter(|o| is_standing_for(o, template_id))
            .cloned()
            .collect();
        found.sort_by_key(|o| o.delivery_date);
        Ok(found)
    }

    async fn instances_for_customer_on(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<OrderInstance>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id && o.delivery_date == date)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Counter Store
// =============================================================================

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn atomic_increment(&self, key: &str, floor: i64) -> StoreResult<i64> {
        let mut state = self.state.lock().await;
        let value = match state.counters.get(key) {
            Some(current) => (current + 1).max(floor),
            None => floor,
        };
        state.counters.insert(key.to_string(), value);
        Ok(value)
    }

    async fn raise_to(&self, key: &str, value: i64) -> StoreResult<i64> {
        let mut state = self.state.lock().await;
        let entry = state.counters.entry(key.to_string()).or_insert(value);
        *entry = (*entry).max(value);
        Ok(*entry)
    }

    async fn current(&self, key: &str) -> StoreResult<Option<i64>> {
        Ok(self.state.lock().await.counters.get(key).copied())
    }
}
