//! # Standing Order Materializer
//!
//! Walks a rolling horizon for each standing order and creates the order
//! instances that are due but missing.
//!
//! ## Horizon Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  now = Sun 2 Jun (IST), horizon = 10, template = Mon/Wed/Fri            │
//! │                                                                         │
//! │   Mon  Tue  Wed  Thu  Fri  Sat  Sun  Mon  Tue  Wed                      │
//! │   3    4    5    6    7    8    9    10   11   12                       │
//! │   ✓    ·    ✓    ·    ✓    ·    ·    ✓    ·    ✓                        │
//! │                                                                         │
//! │  For each ✓:                                                            │
//! │    exists(template, date)? ──yes──► skip (idempotent)                  │
//! │          │ no                                                           │
//! │    manual order for (customer, date)? ──yes──► skip (customer wins)    │
//! │          │ no                                                           │
//! │          ▼                                                              │
//! │    next sequence number ──► price lines ──► insert                      │
//! │                                               │                         │
//! │                      unique (template, date) ─┼─► already materialized  │
//! │                manual order for (cust, date) ─┴─► skip (checked again   │
//! │                                                   inside the insert)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Today is never in the horizon: same-day orders are the customer's call.
//!
//! ## Batch Runs
//! `regenerate_all` is the one entrypoint the outside world triggers (cron,
//! admin button). Running it twice, or two copies at once, creates no
//! duplicates: the existence check is the fast path, the store's uniqueness
//! guard is the authority.

use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::recurrence::{due_dates, horizon, is_due};
use hearth_core::{
    price_lines, DeliveryDateResolver, OrderInstance, OrderOrigin, OrderStatus, PaymentStatus,
    StandingOrderTemplate, TemplateStatus,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ScheduleResult;
use crate::sequence::SequenceAllocator;
use crate::store::{InsertOutcome, OrderStore, TemplateStore};

/// Notes prefix on every generated instance.
pub const GENERATED_NOTES_PREFIX: &str = "Auto-generated from standing order.";

// =============================================================================
// Regeneration Report
// =============================================================================

/// A template that failed during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFailure {
    pub template_id: String,
    pub message: String,
}

/// Outcome of [`StandingOrderMaterializer::regenerate_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationReport {
    /// Templates that were materialized (completed ones not included).
    pub processed: usize,
    /// Templates moved to `Completed` because their end date passed.
    pub completed: usize,
    /// New instances across all templates.
    pub instances_created: usize,
    pub errors: Vec<TemplateFailure>,
}

impl RegenerationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Materializer
// =============================================================================

/// Creates missing order instances for standing order templates.
pub struct StandingOrderMaterializer {
    templates: Arc<dyn TemplateStore>,
    orders: Arc<dyn OrderStore>,
    sequence: Arc<SequenceAllocator>,
    resolver: DeliveryDateResolver,
}

impl StandingOrderMaterializer {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        orders: Arc<dyn OrderStore>,
        sequence: Arc<SequenceAllocator>,
        resolver: DeliveryDateResolver,
    ) -> Self {
        StandingOrderMaterializer {
            templates,
            orders,
            sequence,
            resolver,
        }
    }

    pub fn resolver(&self) -> &DeliveryDateResolver {
        &self.resolver
    }

    /// Materializes one template against the current clock.
    pub async fn materialize(
        &self,
        template: &StandingOrderTemplate,
        horizon_days: u32,
    ) -> ScheduleResult<Vec<OrderInstance>> {
        self.materialize_at(template, horizon_days, Utc::now()).await
    }

    /// Materializes one template as if the clock read `now`.
    ///
    /// Returns only the instances created by this call.
    pub async fn materialize_at(
        &self,
        template: &StandingOrderTemplate,
        horizon_days: u32,
        now: DateTime<Utc>,
    ) -> ScheduleResult<Vec<OrderInstance>> {
        if !template.is_active() {
            debug!(template_id = %template.id, status = %template.status, "Template not active, nothing to materialize");
            return Ok(Vec::new());
        }

        if template.recurrence.is_degenerate() {
            warn!(
                template_id = %template.id,
                kind = template.recurrence.kind(),
                "Recurrence can never fire; no instances will be generated"
            );
        }

        let zone = self.resolver.zone();
        let created = template.created_date(zone);
        let start = self.resolver.tomorrow(now);
        let mut created_instances = Vec::new();

        for date in horizon(start, horizon_days) {
            if !is_due(&template.recurrence, date, created, &template.duration) {
                continue;
            }

            if self
                .orders
                .exists_standing_instance(&template.id, date)
                .await?
            {
                debug!(template_id = %template.id, delivery_date = %date, "Instance exists, skipping");
                continue;
            }

            if self
                .orders
                .has_manual_instance(&template.customer_id, date)
                .await?
            {
                debug!(
                    template_id = %template.id,
                    customer_id = %template.customer_id,
                    delivery_date = %date,
                    "Customer placed a manual order for this date, skipping"
                );
                continue;
            }

            let instance = self.build_instance(template, date, now).await?;

            match self.orders.insert(&instance).await? {
                InsertOutcome::Inserted => {
                    debug!(
                        template_id = %template.id,
                        delivery_date = %date,
                        order_number = %instance.order_number(),
                        "Materialized standing order instance"
                    );
                    created_instances.push(instance);
                }
                InsertOutcome::AlreadyMaterialized => {
                    debug!(
                        template_id = %template.id,
                        delivery_date = %date,
                        skipped_sequence = instance.sequence_number,
                        "Already materialized by a concurrent run"
                    );
                }
                InsertOutcome::ManualOrderExists => {
                    debug!(
                        template_id = %template.id,
                        customer_id = %template.customer_id,
                        delivery_date = %date,
                        skipped_sequence = instance.sequence_number,
                        "Manual order arrived mid-run, skipping"
                    );
                }
            }
        }

        self.refresh_next_delivery(template, start, horizon_days)
            .await;

        Ok(created_instances)
    }

    async fn build_instance(
        &self,
        template: &StandingOrderTemplate,
        delivery_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> ScheduleResult<OrderInstance> {
        let (lines, total_amount) = price_lines(&template.items)?;
        let sequence_number = self.sequence.next().await?;

        Ok(OrderInstance {
            id: Uuid::new_v4().to_string(),
            sequence_number,
            customer_id: template.customer_id.clone(),
            lines,
            total_amount,
            delivery_date,
            status: OrderStatus::Confirmed,
            origin: OrderOrigin::standing(&template.id),
            payment_status: PaymentStatus::Pending,
            notes: Some(generated_notes(template.notes.as_deref())),
            created_at: now,
        })
    }

    /// Updates the advisory next-delivery date. Failures are logged only.
    async fn refresh_next_delivery(
        &self,
        template: &StandingOrderTemplate,
        start: NaiveDate,
        horizon_days: u32,
    ) {
        let created = template.created_date(self.resolver.zone());
        let next = due_dates(
            &template.recurrence,
            created,
            &template.duration,
            start,
            horizon_days,
        )
        .first()
        .copied();

        if next == template.next_delivery_date {
            return;
        }

        if let Err(e) = self.templates.update_next_delivery(&template.id, next).await {
            warn!(template_id = %template.id, error = %e, "Could not refresh next delivery date");
        }
    }

    // =========================================================================
    // Batch Entrypoint
    // =========================================================================

    /// Regenerates every active template against the current clock.
    pub async fn regenerate_all(&self, horizon_days: u32) -> ScheduleResult<RegenerationReport> {
        self.regenerate_all_at(horizon_days, Utc::now()).await
    }

    /// Regenerates every active template as if the clock read `now`.
    ///
    /// Templates are processed one after another. A failing template is
    /// recorded in the report and the batch moves on; only a failure to list
    /// templates aborts the run.
    pub async fn regenerate_all_at(
        &self,
        horizon_days: u32,
        now: DateTime<Utc>,
    ) -> ScheduleResult<RegenerationReport> {
        let templates = self.templates.list_active().await?;
        let today = self.resolver.today(now);
        let mut report = RegenerationReport::default();

        info!(
            templates = templates.len(),
            horizon_days,
            today = %today,
            "Starting standing order regeneration"
        );

        for template in &templates {
            if template.has_ended(today) {
                match self
                    .templates
                    .update_status(&template.id, TemplateStatus::Completed)
                    .await
                {
                    Ok(()) => {
                        info!(template_id = %template.id, "Standing order completed (end date passed)");
                        report.completed += 1;
                    }
                    Err(e) => {
                        error!(template_id = %template.id, error = %e, "Failed to complete standing order");
                        report.errors.push(TemplateFailure {
                            template_id: template.id.clone(),
                            message: e.to_string(),
                        });
                    }
                }
                continue;
            }

            match self.materialize_at(template, horizon_days, now).await {
                Ok(created) => {
                    report.processed += 1;
                    report.instances_created += created.len();
                    if !created.is_empty() {
                        info!(
                            template_id = %template.id,
                            created = created.len(),
                            "Generated standing order instances"
                        );
                    }
                }
                Err(e) => {
                    error!(template_id = %template.id, error = %e, "Error regenerating standing order");
                    report.errors.push(TemplateFailure {
                        template_id: template.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = report.processed,
            completed = report.completed,
            instances_created = report.instances_created,
            errors = report.errors.len(),
            "Standing order regeneration finished"
        );

        Ok(report)
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Removes a template's future, unfulfilled generated instances.
    ///
    /// Instances dated before today in the reference zone are history and
    /// stay. Returns the number deleted.
    pub async fn purge_future_instances(
        &self,
        template_id: &str,
        now: DateTime<Utc>,
    ) -> ScheduleResult<u64> {
        let today = self.resolver.today(now);
        let removed = self
            .orders
            .delete_future_standing_instances(template_id, today)
            .await?;
        info!(template_id, from = %today, removed, "Removed future standing order instances");
        Ok(removed)
    }

    /// Marks a template `Cancelled` and purges its future instances.
    pub async fn cancel(&self, template_id: &str, now: DateTime<Utc>) -> ScheduleResult<u64> {
        self.templates
            .update_status(template_id, TemplateStatus::Cancelled)
            .await?;
        self.templates.update_next_delivery(template_id, None).await?;
        self.purge_future_instances(template_id, now).await
    }
}

/// Notes carried on a generated instance.
pub fn generated_notes(template_notes: Option<&str>) -> String {
    match template_notes.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("{GENERATED_NOTES_PREFIX} {notes}"),
        None => GENERATED_NOTES_PREFIX.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
