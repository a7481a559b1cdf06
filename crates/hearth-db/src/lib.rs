//! # hearth-db: Database Layer for Hearth Wholesale
//!
//! SQLite storage for standing order templates, order instances and the
//! order-number counter, behind the traits the scheduling engine expects.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hearth Data Flow                                 │
//! │                                                                         │
//! │  hearth-scheduler (regenerate-all, cron)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  hearth-schedule ── Arc<dyn TemplateStore / OrderStore / CounterStore>  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     hearth-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│  template      │    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │  order         │    │ 001_init.sql │  │   │
//! │  │   │               │    │  counter       │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (path from hearth.toml or HEARTH_DB_PATH)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and their mapping to `StoreError`
//! - [`repository`] - Trait implementations (template, order, counter)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hearth_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("hearth.db")).await?;
//! let templates = Arc::new(db.templates());
//! let orders = Arc::new(db.orders());
//! let counters = Arc::new(db.counters());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::counter::CounterRepository;
pub use repository::order::OrderRepository;
pub use repository::template::TemplateRepository;

// =============================================================================
// Engine Over SQLite
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use chrono_tz::Asia::Kolkata;
    use hearth_core::{
        DeliveryDateResolver, LineItem, ManualOrderRequest, Money, OrderOrigin, PaymentStatus,
        Recurrence, StandingOrderTemplate, TemplateDuration, TemplateStatus,
    };
    use hearth_schedule::{
        OrderIntake, OrderStore, SequenceAllocator, StandingOrderMaterializer, TemplateStore,
    };
    use std::sync::Arc;

    struct Engine {
        db: Database,
        materializer: Arc<StandingOrderMaterializer>,
        intake: OrderIntake,
    }

    async fn engine() -> Engine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sequence = Arc::new(SequenceAllocator::for_orders(Arc::new(db.counters())));
        let resolver = DeliveryDateResolver::new(4, Kolkata).unwrap();
        let materializer = Arc::new(StandingOrderMaterializer::new(
            Arc::new(db.templates()),
            Arc::new(db.orders()),
            sequence.clone(),
            resolver,
        ));
        let intake = OrderIntake::new(Arc::new(db.orders()), sequence, resolver);
        Engine {
            db,
            materializer,
            intake,
        }
    }

    fn ist(d: u32, h: u32) -> DateTime<Utc> {
        Kolkata
            .with_ymd_and_hms(2024, 6, d, h, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn template(id: &str, customer_id: &str) -> StandingOrderTemplate {
        StandingOrderTemplate {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            items: vec![LineItem::new("bun", "Milk Bun", 12, Money::from_paise(1500))],
            recurrence: Recurrence::weekly([0, 2, 4]),
            duration: TemplateDuration::Indefinite,
            status: TemplateStatus::Active,
            notes: None,
            created_at: ist(1, 10),
            created_by: "admin".into(),
            next_delivery_date: None,
        }
    }

    #[tokio::test]
    async fn test_regenerate_all_twice_is_idempotent() {
        let engine = engine().await;
        let templates = engine.db.templates();
        templates.insert_template(&template("t-1", "cust-1")).await.unwrap();
        templates.insert_template(&template("t-2", "cust-2")).await.unwrap();

        let first = engine.materializer.regenerate_all_at(10, ist(2, 18)).await.unwrap();
        assert_eq!(first.processed, 2);
        assert_eq!(first.instances_created, 10);

        let second = engine.materializer.regenerate_all_at(10, ist(2, 18)).await.unwrap();
        assert_eq!(second.instances_created, 0);
        assert!(second.is_clean());

        let t1 = engine.db.orders().list_for_template("t-1").await.unwrap();
        let dates: Vec<_> = t1.iter().map(|o| o.delivery_date).collect();
        assert_eq!(dates, vec![day(3), day(5), day(7), day(10), day(12)]);
        assert_eq!(
            TemplateStore::get(&templates, "t-1")
                .await
                .unwrap()
                .unwrap()
                .next_delivery_date,
            Some(day(3))
        );
    }

    #[tokio::test]
    async fn test_concurrent_batches_share_one_database() {
        let engine = engine().await;
        engine
            .db
            .templates()
            .insert_template(&template("t-1", "cust-1"))
            .await
            .unwrap();

        let runs: Vec<_> = (0..4)
            .map(|_| {
                let materializer = engine.materializer.clone();
                tokio::spawn(async move { materializer.regenerate_all_at(10, ist(2, 18)).await })
            })
            .collect();

        let mut created = 0;
        for run in runs {
            created += run.await.unwrap().unwrap().instances_created;
        }
        assert_eq!(created, 5);
        assert_eq!(
            engine.db.orders().list_for_template("t-1").await.unwrap().len(),
            5
        );
    }

    #[tokio::test]
    async fn test_manual_order_overrides_and_stays_overridden() {
        let engine = engine().await;
        engine
            .db
            .templates()
            .insert_template(&template("t-1", "cust-1"))
            .await
            .unwrap();
        engine.materializer.regenerate_all_at(10, ist(2, 18)).await.unwrap();

        // Tuesday 09:00 IST is past the cutoff → delivered Wednesday 5 June
        let request = ManualOrderRequest {
            customer_id: "cust-1".into(),
            items: vec![LineItem::new("rusk", "Rusk 200g", 2, Money::from_paise(4500))],
            payment_status: PaymentStatus::Completed,
            notes: None,
        };
        let manual = engine.intake.submit_at(request, ist(4, 9)).await.unwrap();
        assert_eq!(manual.delivery_date, day(5));

        let orders = engine.db.orders();
        let wed = orders.list_for_customer_on("cust-1", day(5)).await.unwrap();
        assert_eq!(wed.len(), 1);
        assert_eq!(wed[0].origin, OrderOrigin::Manual);

        // A later batch run does not bring the Wednesday instance back
        engine.materializer.regenerate_all_at(10, ist(4, 9)).await.unwrap();
        assert!(!OrderStore::exists_standing_instance(&orders, "t-1", day(5))
            .await
            .unwrap());
        assert_eq!(
            orders.list_for_customer_on("cust-1", day(5)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_manual_orders_during_batch_runs_never_share_a_date() {
        let engine = engine().await;
        let customers = ["cust-1", "cust-2", "cust-3"];
        for (i, customer) in customers.iter().enumerate() {
            engine
                .db
                .templates()
                .insert_template(&template(&format!("t-{i}"), customer))
                .await
                .unwrap();
        }

        let sequence = Arc::new(SequenceAllocator::for_orders(Arc::new(engine.db.counters())));
        let resolver = DeliveryDateResolver::new(4, Kolkata).unwrap();
        let intake = Arc::new(OrderIntake::new(
            Arc::new(engine.db.orders()),
            sequence,
            resolver,
        ));

        let mut tasks = Vec::new();
        for customer in customers {
            let materializer = engine.materializer.clone();
            tasks.push(tokio::spawn(async move {
                materializer.regenerate_all_at(10, ist(2, 18)).await.map(|_| ())
            }));

            let intake = intake.clone();
            tasks.push(tokio::spawn(async move {
                let request = ManualOrderRequest {
                    customer_id: customer.into(),
                    items: vec![LineItem::new("rusk", "Rusk 200g", 2, Money::from_paise(4500))],
                    payment_status: PaymentStatus::Pending,
                    notes: None,
                };
                intake.submit_at(request, ist(4, 9)).await.map(|_| ())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let orders = engine.db.orders();
        for customer in customers {
            let wed = orders.list_for_customer_on(customer, day(5)).await.unwrap();
            assert_eq!(wed.len(), 1, "{customer} on 5 June");
            assert_eq!(wed[0].origin, OrderOrigin::Manual);

            // Mondays and Fridays around it are still generated
            for d in [3, 7, 10, 12] {
                let generated = orders.list_for_customer_on(customer, day(d)).await.unwrap();
                assert_eq!(generated.len(), 1);
                assert!(generated[0].origin.is_standing());
            }
        }
    }
}
