//! # Manual Order Intake
//!
//! Accepts a customer's order, resolves its delivery date, and makes sure it
//! replaces any standing-generated order the customer already had for that
//! date.
//!
//! ## Override Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Before                              After manual submit for Tue        │
//! │                                                                         │
//! │  cust-7  Tue  StandingGenerated(t1)  cust-7  Tue  Manual   ◄── new      │
//! │  cust-7  Tue  StandingGenerated(t2)                                     │
//! │  cust-7  Thu  StandingGenerated(t1)  cust-7  Thu  StandingGenerated(t1) │
//! │                                                                         │
//! │  Every generated instance for (customer, date) goes, whichever template │
//! │  produced it. Other manual orders for that date stay.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The delete and the insert are one store call
//! ([`OrderStore::insert_manual_replacing`]). The store also refuses a
//! generated instance for a (customer, date) that holds a manual order, so
//! a batch run racing this submission cannot leave both behind, and a
//! later run cannot bring the replaced one back.

use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::validation::validate_manual_request;
use hearth_core::{
    price_lines, DeliveryDateResolver, DeliveryEstimate, ManualOrderRequest, OrderInstance,
    OrderOrigin, OrderStatus,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ScheduleResult;
use crate::sequence::SequenceAllocator;
use crate::store::OrderStore;

/// Manual order submission with standing-order override.
pub struct OrderIntake {
    orders: Arc<dyn OrderStore>,
    sequence: Arc<SequenceAllocator>,
    resolver: DeliveryDateResolver,
}

impl OrderIntake {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        sequence: Arc<SequenceAllocator>,
        resolver: DeliveryDateResolver,
    ) -> Self {
        OrderIntake {
            orders,
            sequence,
            resolver,
        }
    }

    /// Submits a manual order against the current clock.
    pub async fn submit(&self, request: ManualOrderRequest) -> ScheduleResult<OrderInstance> {
        self.submit_at(request, Utc::now()).await
    }

    /// Submits a manual order as if it arrived at `submitted_at`.
    ///
    /// ## Steps
    /// 1. Validate and price the request
    /// 2. Resolve the delivery date from the submission instant
    /// 3. Allocate an order number (fatal if the counter store is down)
    /// 4. Insert the manual instance, removing colliding generated ones in
    ///    the same atomic step
    pub async fn submit_at(
        &self,
        request: ManualOrderRequest,
        submitted_at: DateTime<Utc>,
    ) -> ScheduleResult<OrderInstance> {
        validate_manual_request(&request)?;
        let (lines, total_amount) = price_lines(&request.items)?;
        let delivery_date = self.resolver.resolve(submitted_at);
        let sequence_number = self.sequence.next().await?;

        let instance = OrderInstance {
            id: Uuid::new_v4().to_string(),
            sequence_number,
            customer_id: request.customer_id,
            lines,
            total_amount,
            delivery_date,
            status: OrderStatus::Pending,
            origin: OrderOrigin::Manual,
            payment_status: request.payment_status,
            notes: request.notes,
            created_at: submitted_at,
        };

        let removed = self.orders.insert_manual_replacing(&instance).await?;
        if removed > 0 {
            warn!(
                customer_id = %instance.customer_id,
                delivery_date = %delivery_date,
                removed,
                "Manual order replaces standing-generated order"
            );
        }

        info!(
            customer_id = %instance.customer_id,
            delivery_date = %delivery_date,
            order_number = %instance.order_number(),
            "Manual order accepted"
        );

        Ok(instance)
    }

    /// Deletes generated instances for (customer, date) without placing an
    /// order, for clearing a day by hand.
    ///
    /// Returns how many were removed.
    pub async fn apply_override(&self, customer_id: &str, date: NaiveDate) -> ScheduleResult<u64> {
        let removed = self
            .orders
            .delete_standing_instance_for(customer_id, date)
            .await?;

        if removed > 0 {
            warn!(
                customer_id,
                delivery_date = %date,
                removed,
                "Manual order replaces standing-generated order"
            );
        }

        Ok(removed)
    }

    /// Delivery date preview for an order submitted now.
    pub fn estimate(&self) -> DeliveryEstimate {
        self.resolver.describe(Utc::now())
    }

    pub fn estimate_at(&self, instant: DateTime<Utc>) -> DeliveryEstimate {
        self.resolver.describe(instant)
    }
}
