//! # Order Repository
//!
//! Order instances (manual and generated) and their priced lines.
//!
//! ## Uniqueness
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CREATE UNIQUE INDEX idx_order_instances_standing_date                  │
//! │      ON order_instances(template_id, delivery_date)                     │
//! │      WHERE origin = 'standing'                                          │
//! │                                                                         │
//! │  insert(generated t1, Wed) ──► ok                                       │
//! │  insert(generated t1, Wed) ──► UNIQUE failed ──► AlreadyMaterialized    │
//! │  insert(manual,       Wed) ──► ok (manual rows are outside the index)   │
//! │  insert(generated t2, Wed) ──► 0 rows (manual on Wed) ──► ManualOrder-  │
//! │                                                           Exists        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The manual-order guard lives in the INSERT itself
//! (`INSERT ... SELECT ... WHERE NOT EXISTS`), so it is evaluated under the
//! same write lock as the row it protects. The replacing insert for manual
//! orders deletes and inserts inside one transaction. Either way the row and
//! its lines commit together, so a rejected insert leaves no stray lines.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::{Money, OrderInstance, OrderLine, OrderOrigin, OrderStatus, PaymentStatus};
use hearth_schedule::{InsertOutcome, OrderStore, StoreResult};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};

const ORIGIN_MANUAL: &str = "manual";
const ORIGIN_STANDING: &str = "standing";

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, FromRow)]
struct OrderRecord {
    id: String,
    sequence_number: i64,
    customer_id: String,
    delivery_date: NaiveDate,
    total_paise: i64,
    status: OrderStatus,
    origin: String,
    template_id: Option<String>,
    payment_status: PaymentStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct OrderItemRecord {
    order_id: String,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price_paise: i64,
    subtotal_paise: i64,
}

impl From<OrderItemRecord> for OrderLine {
    fn from(record: OrderItemRecord) -> Self {
        OrderLine {
            product_id: record.product_id,
            product_name: record.product_name,
            quantity: record.quantity,
            unit_price: Money::from_paise(record.unit_price_paise),
            subtotal: Money::from_paise(record.subtotal_paise),
        }
    }
}

impl OrderRecord {
    fn into_instance(self, lines: Vec<OrderLine>) -> DbResult<OrderInstance> {
        let origin = match (self.origin.as_str(), self.template_id) {
            (ORIGIN_MANUAL, _) => OrderOrigin::Manual,
            (ORIGIN_STANDING, Some(template_id)) => OrderOrigin::StandingGenerated { template_id },
            (other, _) => {
                return Err(DbError::decode(
                    &self.id,
                    format!("origin '{other}' without a usable template id"),
                ))
            }
        };

        Ok(OrderInstance {
            id: self.id,
            sequence_number: self.sequence_number,
            customer_id: self.customer_id,
            lines,
            total_amount: Money::from_paise(self.total_paise),
            delivery_date: self.delivery_date,
            status: self.status,
            origin,
            payment_status: self.payment_status,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

fn origin_columns(origin: &OrderOrigin) -> (&'static str, Option<&str>) {
    match origin {
        OrderOrigin::Manual => (ORIGIN_MANUAL, None),
        OrderOrigin::StandingGenerated { template_id } => {
            (ORIGIN_STANDING, Some(template_id.as_str()))
        }
    }
}

/// Writes the instance row. A generated instance is written only when the
/// customer has no manual order on that date; returns the rows written.
async fn insert_row(conn: &mut SqliteConnection, instance: &OrderInstance) -> DbResult<u64> {
    let (origin, template_id) = origin_columns(&instance.origin);

    let result = sqlx::query(
        r#"
        INSERT INTO order_instances (
            id, sequence_number, customer_id, delivery_date, total_paise, status,
            origin, template_id, payment_status, notes, created_at
        )
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
        WHERE ?7 = 'manual' OR NOT EXISTS (
            SELECT 1 FROM order_instances
            WHERE origin = 'manual' AND customer_id = ?3 AND delivery_date = ?4
        )
        "#,
    )
    .bind(&instance.id)
    .bind(instance.sequence_number)
    .bind(&instance.customer_id)
    .bind(instance.delivery_date)
    .bind(instance.total_amount.paise())
    .bind(instance.status)
    .bind(origin)
    .bind(template_id)
    .bind(instance.payment_status)
    .bind(&instance.notes)
    .bind(instance.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

async fn insert_lines(conn: &mut SqliteConnection, instance: &OrderInstance) -> DbResult<()> {
    for (position, line) in instance.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO order_items (
                order_id, position, product_id, product_name,
                quantity, unit_price_paise, subtotal_paise
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&instance.id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price.paise())
        .bind(line.subtotal.paise())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

const ORDER_COLUMNS: &str = r#"
    id, sequence_number, customer_id, delivery_date, total_paise, status,
    origin, template_id, payment_status, notes, created_at
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for order instances.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an instance and its lines.
    ///
    /// Returns `AlreadyMaterialized` when the partial unique index rejects a
    /// generated duplicate and `ManualOrderExists` when the customer has a
    /// manual order that day; every other constraint failure is an error.
    pub async fn insert_instance(&self, instance: &OrderInstance) -> DbResult<InsertOutcome> {
        let (_, template_id) = origin_columns(&instance.origin);
        let mut tx = self.pool.begin().await?;

        match insert_row(&mut tx, instance).await {
            Ok(0) => {
                debug!(
                    template_id = ?template_id,
                    customer_id = %instance.customer_id,
                    delivery_date = %instance.delivery_date,
                    "Manual order holds this date"
                );
                return Ok(InsertOutcome::ManualOrderExists);
            }
            Ok(_) => {}
            Err(e) if e.is_standing_duplicate() => {
                debug!(
                    template_id = ?template_id,
                    delivery_date = %instance.delivery_date,
                    "Generated instance already exists"
                );
                return Ok(InsertOutcome::AlreadyMaterialized);
            }
            Err(e) => return Err(e),
        }

        insert_lines(&mut tx, instance).await?;
        tx.commit().await?;
        Ok(InsertOutcome::Inserted)
    }

    /// Deletes generated instances for the manual order's (customer, date)
    /// and inserts it, in one transaction. Returns the number deleted.
    pub async fn insert_replacing_generated(&self, instance: &OrderInstance) -> DbResult<u64> {
        if instance.origin.is_standing() {
            return Err(DbError::WrongOrigin {
                id: instance.id.clone(),
            });
        }

        let mut tx = self.pool.begin().await?;

        // Write first, so the transaction holds the write lock before it reads
        let removed = sqlx::query(
            r#"
            DELETE FROM order_instances
            WHERE origin = 'standing' AND customer_id = ?1 AND delivery_date = ?2
            "#,
        )
        .bind(&instance.customer_id)
        .bind(instance.delivery_date)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        insert_row(&mut tx, instance).await?;
        insert_lines(&mut tx, instance).await?;
        tx.commit().await?;

        Ok(removed)
    }

    pub async fn standing_instance_exists(
        &self,
        template_id: &str,
        date: NaiveDate,
    ) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM order_instances
            WHERE origin = 'standing' AND template_id = ?1 AND delivery_date = ?2
            "#,
        )
        .bind(template_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn manual_instance_exists(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM order_instances
            WHERE origin = 'manual' AND customer_id = ?1 AND delivery_date = ?2
            "#,
        )
        .bind(customer_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Deletes a template's unfulfilled generated instances from `from` on.
    pub async fn delete_future_for_template(
        &self,
        template_id: &str,
        from: NaiveDate,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM order_instances
            WHERE origin = 'standing'
              AND template_id = ?1
              AND delivery_date >= ?2
              AND status != 'delivered'
            "#,
        )
        .bind(template_id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes every generated instance for (customer, date).
    pub async fn delete_generated_for_customer(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM order_instances
            WHERE origin = 'standing' AND customer_id = ?1 AND delivery_date = ?2
            "#,
        )
        .bind(customer_id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_for_template(&self, template_id: &str) -> DbResult<Vec<OrderInstance>> {
        let records = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM order_instances \
             WHERE origin = 'standing' AND template_id = ?1 \
             ORDER BY delivery_date, sequence_number"
        ))
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_lines(records).await
    }

    pub async fn list_for_customer_on(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> DbResult<Vec<OrderInstance>> {
        let records = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM order_instances \
             WHERE customer_id = ?1 AND delivery_date = ?2 \
             ORDER BY sequence_number"
        ))
        .bind(customer_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        self.attach_lines(records).await
    }

    /// Loads lines for a batch of orders with a single `IN (...)` query.
    async fn attach_lines(&self, records: Vec<OrderRecord>) -> DbResult<Vec<OrderInstance>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT order_id, product_id, product_name, quantity, unit_price_paise, subtotal_paise \
             FROM order_items WHERE order_id IN (",
        );
        let mut ids = builder.separated(", ");
        for record in &records {
            ids.push_bind(record.id.clone());
        }
        ids.push_unseparated(") ORDER BY order_id, position");

        let items = builder
            .build_query_as::<OrderItemRecord>()
            .fetch_all(&self.pool)
            .await?;

        let mut lines_by_order: HashMap<String, Vec<OrderLine>> = HashMap::new();
        for item in items {
            lines_by_order
                .entry(item.order_id.clone())
                .or_default()
                .push(item.into());
        }

        records
            .into_iter()
            .map(|record| {
                let lines = lines_by_order.remove(&record.id).unwrap_or_default();
                record.into_instance(lines)
            })
            .collect()
    }
}

// =============================================================================
// OrderStore
// =============================================================================

#[async_trait]
impl OrderStore for OrderRepository {
    async fn exists_standing_instance(
        &self,
        template_id: &str,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        Ok(self.standing_instance_exists(template_id, date).await?)
    }

    async fn has_manual_instance(&self, customer_id: &str, date: NaiveDate) -> StoreResult<bool> {
        Ok(self.manual_instance_exists(customer_id, date).await?)
    }

    async fn insert(&self, instance: &OrderInstance) -> StoreResult<InsertOutcome> {
        Ok(self.insert_instance(instance).await?)
    }

    async fn insert_manual_replacing(&self, instance: &OrderInstance) -> StoreResult<u64> {
        Ok(self.insert_replacing_generated(instance).await?)
    }

    async fn delete_future_standing_instances(
        &self,
        template_id: &str,
        from: NaiveDate,
    ) -> StoreResult<u64> {
        Ok(self.delete_future_for_template(template_id, from).await?)
    }

    async fn delete_standing_instance_for(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> StoreResult<u64> {
        Ok(self.delete_generated_for_customer(customer_id, date).await?)
    }

    async fn instances_for_template(&self, template_id: &str) -> StoreResult<Vec<OrderInstance>> {
        Ok(self.list_for_template(template_id).await?)
    }

    async fn instances_for_customer_on(
        &self,
        customer_id: &str,
        date: NaiveDate,
    ) -> StoreResult<Vec<OrderInstance>> {
        Ok(self.list_for_customer_on(customer_id, date).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::TimeZone;
    use hearth_core::{price_lines, LineItem};

    async fn repo() -> (Database, OrderRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();
        (db, repo)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn instance(customer_id: &str, date: NaiveDate, origin: OrderOrigin, seq: i64) -> OrderInstance {
        let items = vec![
            LineItem::new("bun", "Milk Bun", 12, Money::from_paise(1500)),
            LineItem::new("rusk", "Rusk 200g", 3, Money::from_paise(4500)),
        ];
        let (lines, total_amount) = price_lines(&items).unwrap();
        OrderInstance {
            id: uuid::Uuid::new_v4().to_string(),
            sequence_number: seq,
            customer_id: customer_id.to_string(),
            lines,
            total_amount,
            delivery_date: date,
            status: OrderStatus::Confirmed,
            origin,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 4, 30, 0).unwrap(),
        }
    }

    async fn line_rows(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let (_db, repo) = repo().await;
        let order = instance("cust-1", day(5), OrderOrigin::standing("t-1"), 101);
        assert_eq!(
            repo.insert_instance(&order).await.unwrap(),
            InsertOutcome::Inserted
        );

        let loaded = repo.list_for_template("t-1").await.unwrap();
        assert_eq!(loaded, vec![order]);
    }

    #[tokio::test]
    async fn test_generated_duplicate_is_already_materialized() {
        let (db, repo) = repo().await;
        let first = instance("cust-1", day(5), OrderOrigin::standing("t-1"), 101);
        let second = instance("cust-1", day(5), OrderOrigin::standing("t-1"), 102);

        repo.insert_instance(&first).await.unwrap();
        assert_eq!(
            repo.insert_instance(&second).await.unwrap(),
            InsertOutcome::AlreadyMaterialized
        );

        // The rejected instance left no lines behind
        assert_eq!(line_rows(&db).await, 2);
        assert!(repo.standing_instance_exists("t-1", day(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_manual_orders_bypass_standing_index() {
        let (_db, repo) = repo().await;
        repo.insert_instance(&instance("cust-1", day(5), OrderOrigin::standing("t-1"), 101))
            .await
            .unwrap();
        for seq in [102, 103] {
            let outcome = repo
                .insert_instance(&instance("cust-1", day(5), OrderOrigin::Manual, seq))
                .await
                .unwrap();
            assert_eq!(outcome, InsertOutcome::Inserted);
        }

        assert!(repo.manual_instance_exists("cust-1", day(5)).await.unwrap());
        assert!(!repo.manual_instance_exists("cust-1", day(6)).await.unwrap());
        assert_eq!(repo.list_for_customer_on("cust-1", day(5)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_generated_refused_when_manual_holds_date() {
        let (db, repo) = repo().await;
        repo.insert_instance(&instance("cust-1", day(5), OrderOrigin::Manual, 101))
            .await
            .unwrap();

        let outcome = repo
            .insert_instance(&instance("cust-1", day(5), OrderOrigin::standing("t-1"), 102))
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::ManualOrderExists);
        assert!(!repo.standing_instance_exists("t-1", day(5)).await.unwrap());
        assert_eq!(line_rows(&db).await, 2);

        // Other customers and other dates are unaffected
        for (customer, date, seq) in [("cust-2", day(5), 103), ("cust-1", day(6), 104)] {
            let outcome = repo
                .insert_instance(&instance(customer, date, OrderOrigin::standing("t-1"), seq))
                .await
                .unwrap();
            assert_eq!(outcome, InsertOutcome::Inserted);
        }
    }

    #[tokio::test]
    async fn test_replacing_insert_swaps_generated_for_manual() {
        let (db, repo) = repo().await;
        for order in [
            instance("cust-1", day(4), OrderOrigin::standing("t-1"), 1),
            instance("cust-1", day(4), OrderOrigin::standing("t-2"), 2),
            instance("cust-1", day(6), OrderOrigin::standing("t-1"), 3),
        ] {
            repo.insert_instance(&order).await.unwrap();
        }

        let manual = instance("cust-1", day(4), OrderOrigin::Manual, 4);
        assert_eq!(repo.insert_replacing_generated(&manual).await.unwrap(), 2);

        let on_date = repo.list_for_customer_on("cust-1", day(4)).await.unwrap();
        assert_eq!(on_date, vec![manual]);
        assert_eq!(line_rows(&db).await, 4);

        // A batch run afterwards cannot put the generated instance back
        let outcome = repo
            .insert_instance(&instance("cust-1", day(4), OrderOrigin::standing("t-1"), 5))
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::ManualOrderExists);
    }

    #[tokio::test]
    async fn test_replacing_insert_rolls_back_on_conflict() {
        let (_db, repo) = repo().await;
        for order in [
            instance("cust-1", day(4), OrderOrigin::standing("t-1"), 1),
            instance("cust-2", day(4), OrderOrigin::Manual, 2),
        ] {
            repo.insert_instance(&order).await.unwrap();
        }

        // Sequence number 2 is taken, so the delete must not stick either
        let err = repo
            .insert_replacing_generated(&instance("cust-1", day(4), OrderOrigin::Manual, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(repo.standing_instance_exists("t-1", day(4)).await.unwrap());

        let err = OrderStore::insert_manual_replacing(
            &repo,
            &instance("cust-1", day(7), OrderOrigin::standing("t-1"), 9),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, hearth_schedule::StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reused_sequence_number_is_conflict() {
        let (_db, repo) = repo().await;
        repo.insert_instance(&instance("cust-1", day(5), OrderOrigin::Manual, 101))
            .await
            .unwrap();

        let err = OrderStore::insert(
            &repo,
            &instance("cust-2", day(5), OrderOrigin::Manual, 101),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, hearth_schedule::StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_future_keeps_past_and_delivered() {
        let (db, repo) = repo().await;
        let mut delivered = instance("c", day(8), OrderOrigin::standing("t-1"), 1);
        delivered.status = OrderStatus::Delivered;
        for order in [
            instance("c", day(2), OrderOrigin::standing("t-1"), 2),
            instance("c", day(7), OrderOrigin::standing("t-1"), 3),
            instance("c", day(9), OrderOrigin::standing("t-2"), 4),
            instance("c", day(9), OrderOrigin::Manual, 5),
            delivered,
        ] {
            repo.insert_instance(&order).await.unwrap();
        }

        let removed = repo.delete_future_for_template("t-1", day(3)).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = repo.list_for_template("t-1").await.unwrap();
        let dates: Vec<_> = remaining.iter().map(|o| o.delivery_date).collect();
        assert_eq!(dates, vec![day(2), day(8)]);

        // Lines of the deleted instance went with it
        assert_eq!(line_rows(&db).await, 8);
    }

    #[tokio::test]
    async fn test_override_delete_spans_templates() {
        let (_db, repo) = repo().await;
        for order in [
            instance("cust-1", day(4), OrderOrigin::standing("t-1"), 1),
            instance("cust-1", day(4), OrderOrigin::standing("t-2"), 2),
            instance("cust-1", day(4), OrderOrigin::Manual, 3),
            instance("cust-2", day(4), OrderOrigin::standing("t-3"), 4),
        ] {
            repo.insert_instance(&order).await.unwrap();
        }

        let removed = repo
            .delete_generated_for_customer("cust-1", day(4))
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let left = repo.list_for_customer_on("cust-1", day(4)).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].origin, OrderOrigin::Manual);
    }
}
