//! # Standing Order Service
//!
//! Admin-facing lifecycle operations for standing orders. Each operation
//! keeps the materialized instances consistent with the template it touched.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► ACTIVE ──── end date passed (batch) ────► COMPLETED        │
//! │                │ ▲                                                      │
//! │        cancel  │ │ reactivate (re-materialize)                          │
//! │                ▼ │                                                      │
//! │             CANCELLED   (future unfulfilled instances deleted)          │
//! │                                                                         │
//! │   edit items / recurrence / duration while ACTIVE:                      │
//! │     delete instances from tomorrow on, re-materialize under new rule    │
//! │                                                                         │
//! │   delete: cancellation cleanup, then the record itself                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Today's instance is never rewritten by an edit: the bakery may already be
//! baking it. Cancellation does remove today's undelivered instance.

use chrono::{DateTime, Utc};
use hearth_core::validation::{validate_draft, validate_patch};
use hearth_core::{
    OrderInstance, StandingOrderTemplate, TemplateDraft, TemplatePatch, TemplateStatus,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ScheduleError, ScheduleResult};
use crate::materializer::StandingOrderMaterializer;
use crate::store::{OrderStore, TemplateStore};

/// Result of a create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateChange {
    pub template: StandingOrderTemplate,
    pub instances_created: usize,
    pub instances_removed: u64,
}

/// Lifecycle operations over templates and their generated instances.
pub struct StandingOrderService {
    templates: Arc<dyn TemplateStore>,
    orders: Arc<dyn OrderStore>,
    materializer: Arc<StandingOrderMaterializer>,
    horizon_days: u32,
}

impl StandingOrderService {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        orders: Arc<dyn OrderStore>,
        materializer: Arc<StandingOrderMaterializer>,
        horizon_days: u32,
    ) -> Self {
        StandingOrderService {
            templates,
            orders,
            materializer,
            horizon_days,
        }
    }

    pub fn materializer(&self) -> &StandingOrderMaterializer {
        &self.materializer
    }

    pub async fn get_template(&self, id: &str) -> ScheduleResult<StandingOrderTemplate> {
        self.templates
            .get(id)
            .await?
            .ok_or_else(|| ScheduleError::TemplateNotFound(id.to_string()))
    }

    /// Creates a template and materializes its horizon straight away.
    pub async fn create_template(
        &self,
        draft: TemplateDraft,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> ScheduleResult<TemplateChange> {
        let today = self.materializer.resolver().today(now);
        validate_draft(&draft, today)?;

        let template = StandingOrderTemplate {
            id: Uuid::new_v4().to_string(),
            customer_id: draft.customer_id,
            items: draft.items,
            recurrence: draft.recurrence,
            duration: draft.duration,
            status: TemplateStatus::Active,
            notes: draft.notes,
            created_at: now,
            created_by: created_by.to_string(),
            next_delivery_date: None,
        };

        self.templates.insert(&template).await?;
        info!(
            template_id = %template.id,
            customer_id = %template.customer_id,
            recurrence = template.recurrence.kind(),
            "Standing order created"
        );

        let created = self
            .materializer
            .materialize_at(&template, self.horizon_days, now)
            .await?;

        Ok(TemplateChange {
            template: self.get_template(&template.id).await?,
            instances_created: created.len(),
            instances_removed: 0,
        })
    }

    /// Applies a partial update.
    ///
    /// ## Side Effects
    /// - status → Cancelled: future instances deleted
    /// - status → Active from another state: horizon re-materialized
    /// - items, recurrence or duration changed on an active template:
    ///   instances from tomorrow on deleted, then re-materialized
    pub async fn update_template(
        &self,
        id: &str,
        patch: TemplatePatch,
        now: DateTime<Utc>,
    ) -> ScheduleResult<TemplateChange> {
        let resolver = self.materializer.resolver();
        validate_patch(&patch, resolver.today(now))?;

        let mut template = self.get_template(id).await?;
        let previous_status = template.status;
        let changes_schedule = patch.changes_schedule();
        if let Some(notes) = patch.notes_update() {
            template.notes = notes;
        }

        if let Some(items) = patch.items {
            template.items = items;
        }
        if let Some(recurrence) = patch.recurrence {
            template.recurrence = recurrence;
        }
        if let Some(duration) = patch.duration {
            template.duration = duration;
        }
        if let Some(status) = patch.status {
            template.status = status;
        }

        self.templates.save(&template).await?;

        let mut instances_removed = 0;
        let mut instances_created = 0;

        match template.status {
            TemplateStatus::Cancelled if patch.status == Some(TemplateStatus::Cancelled) => {
                self.templates.update_next_delivery(id, None).await?;
                instances_removed = self.materializer.purge_future_instances(id, now).await?;
            }
            TemplateStatus::Active => {
                if changes_schedule {
                    instances_removed = self
                        .orders
                        .delete_future_standing_instances(id, resolver.tomorrow(now))
                        .await?;
                }
                if changes_schedule || previous_status != TemplateStatus::Active {
                    instances_created = self
                        .materializer
                        .materialize_at(&template, self.horizon_days, now)
                        .await?
                        .len();
                }
            }
            _ => {}
        }

        info!(
            template_id = id,
            status = %template.status,
            instances_created,
            instances_removed,
            "Standing order updated"
        );

        Ok(TemplateChange {
            template: self.get_template(id).await?,
            instances_created,
            instances_removed,
        })
    }

    /// Cancels a template. Returns how many future instances were deleted.
    pub async fn cancel_template(&self, id: &str, now: DateTime<Utc>) -> ScheduleResult<u64> {
        self.get_template(id).await?;
        self.materializer.cancel(id, now).await
    }

    /// Deletes a template and its future instances.
    pub async fn delete_template(&self, id: &str, now: DateTime<Utc>) -> ScheduleResult<u64> {
        self.get_template(id).await?;
        let removed = self.materializer.purge_future_instances(id, now).await?;

        if !self.templates.delete(id).await? {
            return Err(ScheduleError::TemplateNotFound(id.to_string()));
        }

        info!(template_id = id, removed, "Standing order deleted");
        Ok(removed)
    }

    /// Manually materializes one template. Only active templates qualify.
    pub async fn regenerate_template(
        &self,
        id: &str,
        horizon_days: u32,
        now: DateTime<Utc>,
    ) -> ScheduleResult<Vec<OrderInstance>> {
        let template = self.get_template(id).await?;
        if !template.is_active() {
            return Err(ScheduleError::TemplateNotActive {
                id: id.to_string(),
                status: template.status.to_string(),
            });
        }

        self.materializer
            .materialize_at(&template, horizon_days, now)
            .await
    }

    /// All instances generated from a template.
    pub async fn generated_instances(&self, id: &str) -> ScheduleResult<Vec<OrderInstance>> {
        Ok(self.orders.instances_for_template(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::sequence::SequenceAllocator;
    use crate::testing::{day, instance, ist, items};
    use chrono_tz::Asia::Kolkata;
    use hearth_core::{
        DeliveryDateResolver, LineItem, Money, OrderOrigin, OrderStatus, Recurrence,
        TemplateDuration,
    };

    fn service(store: Arc<InMemoryStore>) -> StandingOrderService {
        let sequence = Arc::new(SequenceAllocator::for_orders(store.clone()));
        let materializer = Arc::new(StandingOrderMaterializer::new(
            store.clone(),
            store.clone(),
            sequence,
            DeliveryDateResolver::new(4, Kolkata).unwrap(),
        ));
        StandingOrderService::new(store.clone(), store, materializer, 10)
    }

    fn draft() -> TemplateDraft {
        TemplateDraft {
            customer_id: "cust-1".into(),
            items: items(),
            recurrence: Recurrence::weekly([0, 2, 4]),
            duration: TemplateDuration::Indefinite,
            notes: None,
        }
    }

    /// Sunday 2 June 2024, 18:00 IST.
    fn now() -> DateTime<Utc> {
        ist(2024, 6, 2, 18, 0)
    }

    #[tokio::test]
    async fn test_create_materializes_immediately() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(store.clone());

        let change = svc.create_template(draft(), "admin", now()).await.unwrap();
        assert_eq!(change.instances_created, 5);
        assert_eq!(change.template.status, TemplateStatus::Active);
        assert_eq!(change.template.created_by, "admin");
        assert_eq!(change.template.next_delivery_date, Some(day(2024, 6, 3)));

        let generated = svc.generated_instances(&change.template.id).await.unwrap();
        assert_eq!(generated.len(), 5);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_draft() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(store.clone());

        let mut bad = draft();
        bad.recurrence = Recurrence::every(0);
        let err = svc.create_template(bad, "admin", now()).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Validation(_)));

        let mut past = draft();
        past.duration = TemplateDuration::EndDate {
            date: day(2024, 6, 1),
        };
        assert!(svc.create_template(past, "admin", now()).await.is_err());
        assert!(store.all_templates().await.is_empty());
    }

    #[tokio::test]
    async fn test_recurrence_edit_replaces_future_instances() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(store.clone());
        let id = svc
            .create_template(draft(), "admin", now())
            .await
            .unwrap()
            .template
            .id;

        let patch = TemplatePatch {
            recurrence: Some(Recurrence::weekly([1, 3])),
            ..Default::default()
        };
        let change = svc.update_template(&id, patch, now()).await.unwrap();

        assert_eq!(change.instances_removed, 5);
        // Tue 4, Thu 6, Tue 11
        assert_eq!(change.instances_created, 3);
        let dates: Vec<_> = svc
            .generated_instances(&id)
            .await
            .unwrap()
            .iter()
            .map(|i| i.delivery_date)
            .collect();
        assert_eq!(dates, vec![day(2024, 6, 4), day(2024, 6, 6), day(2024, 6, 11)]);
    }

    #[tokio::test]
    async fn test_item_edit_reprices_future_instances() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(store.clone());
        let id = svc
            .create_template(draft(), "admin", now())
            .await
            .unwrap()
            .template
            .id;

        let patch = TemplatePatch {
            items: Some(vec![LineItem::new("loaf", "Sandwich Loaf", 4, Money::from_paise(6000))]),
            ..Default::default()
        };
        svc.update_template(&id, patch, now()).await.unwrap();

        let generated = svc.generated_instances(&id).await.unwrap();
        assert_eq!(generated.len(), 5);
        assert!(generated.iter().all(|i| i.total_amount.paise() == 24000));
    }

    #[tokio::test]
    async fn test_notes_edit_leaves_instances_alone() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(store.clone());
        let id = svc
            .create_template(draft(), "admin", now())
            .await
            .unwrap()
            .template
            .id;
        let before: Vec<String> = store.all_orders().await.into_iter().map(|o| o.id).collect();

        let patch = TemplatePatch {
            notes: Some("Gate code 4411".into()),
            ..Default::default()
        };
        let change = svc.update_template(&id, patch, now()).await.unwrap();
        assert_eq!(change.instances_created, 0);
        assert_eq!(change.instances_removed, 0);
        assert_eq!(change.template.notes.as_deref(), Some("Gate code 4411"));

        let after: Vec<String> = store.all_orders().await.into_iter().map(|o| o.id).collect();
        assert_eq!(before, after);

        let clear = TemplatePatch {
            notes: Some(String::new()),
            ..Default::default()
        };
        let change = svc.update_template(&id, clear, now()).await.unwrap();
        assert_eq!(change.template.notes, None);
        assert_eq!(svc.get_template(&id).await.unwrap().notes, None);
    }

    #[tokio::test]
    async fn test_cancel_then_reactivate() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(store.clone());
        let id = svc
            .create_template(draft(), "admin", now())
            .await
            .unwrap()
            .template
            .id;

        let cancel = TemplatePatch {
            status: Some(TemplateStatus::Cancelled),
            ..Default::default()
        };
        let change = svc.update_template(&id, cancel, now()).await.unwrap();
        assert_eq!(change.instances_removed, 5);
        assert_eq!(change.template.next_delivery_date, None);
        assert!(svc.generated_instances(&id).await.unwrap().is_empty());

        let reactivate = TemplatePatch {
            status: Some(TemplateStatus::Active),
            ..Default::default()
        };
        let change = svc.update_template(&id, reactivate, now()).await.unwrap();
        assert_eq!(change.instances_created, 5);
    }

    #[tokio::test]
    async fn test_cancel_keeps_history_and_delivered() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(store.clone());
        let id = svc
            .create_template(draft(), "admin", now())
            .await
            .unwrap()
            .template
            .id;

        let past = instance("cust-1", day(2024, 5, 31), OrderOrigin::standing(&id), 1);
        OrderStore::insert(store.as_ref(), &past).await.unwrap();
        let mut delivered_today = instance("cust-1", day(2024, 6, 2), OrderOrigin::standing(&id), 2);
        delivered_today.status = OrderStatus::Delivered;
        OrderStore::insert(store.as_ref(), &delivered_today)
            .await
            .unwrap();

        let removed = svc.cancel_template(&id, now()).await.unwrap();
        assert_eq!(removed, 5);
        assert_eq!(svc.generated_instances(&id).await.unwrap().len(), 2);
        assert_eq!(
            svc.get_template(&id).await.unwrap().status,
            TemplateStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_delete_template() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(store.clone());
        let id = svc
            .create_template(draft(), "admin", now())
            .await
            .unwrap()
            .template
            .id;

        let removed = svc.delete_template(&id, now()).await.unwrap();
        assert_eq!(removed, 5);
        assert!(matches!(
            svc.get_template(&id).await,
            Err(ScheduleError::TemplateNotFound(_))
        ));
        assert!(matches!(
            svc.delete_template(&id, now()).await,
            Err(ScheduleError::TemplateNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_regenerate_requires_active() {
        let store = Arc::new(InMemoryStore::new());
        let svc = service(store.clone());
        let id = svc
            .create_template(draft(), "admin", now())
            .await
            .unwrap()
            .template
            .id;

        // A wider horizon picks up the next Friday too
        let extra = svc.regenerate_template(&id, 14, now()).await.unwrap();
        assert_eq!(extra.len(), 1);
        assert_eq!(extra[0].delivery_date, day(2024, 6, 14));

        svc.cancel_template(&id, now()).await.unwrap();
        let err = svc.regenerate_template(&id, 10, now()).await.unwrap_err();
        assert!(matches!(err, ScheduleError::TemplateNotActive { .. }));
    }
}
