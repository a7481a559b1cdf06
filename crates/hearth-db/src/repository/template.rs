//! # Template Repository
//!
//! Standing order templates and their line items.
//!
//! ## Storage Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  standing_order_templates            standing_order_items               │
//! │  ─────────────────────────           ────────────────────               │
//! │  id ◄──────────────────────────────  template_id (ON DELETE CASCADE)    │
//! │  recurrence  (JSON text)             position                           │
//! │  end_date    (NULL = indefinite)     product_id / name                  │
//! │  status      (CHECK constrained)     quantity / unit_price_paise        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A template whose recurrence JSON no longer parses is reported as corrupt
//! by `get` and skipped by `list_active`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::{
    LineItem, Money, Recurrence, StandingOrderTemplate, TemplateDuration, TemplateStatus,
};
use hearth_schedule::{StoreResult, TemplateStore};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use tracing::{debug, error};

use crate::error::{DbError, DbResult};

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, FromRow)]
struct TemplateRecord {
    id: String,
    customer_id: String,
    recurrence: String,
    end_date: Option<NaiveDate>,
    status: TemplateStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    created_by: String,
    next_delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, FromRow)]
struct TemplateItemRecord {
    template_id: String,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price_paise: i64,
}

impl From<TemplateItemRecord> for LineItem {
    fn from(record: TemplateItemRecord) -> Self {
        LineItem::new(
            record.product_id,
            record.product_name,
            record.quantity,
            Money::from_paise(record.unit_price_paise),
        )
    }
}

impl TemplateRecord {
    fn into_template(self, items: Vec<LineItem>) -> DbResult<StandingOrderTemplate> {
        let recurrence: Recurrence = serde_json::from_str(&self.recurrence)
            .map_err(|e| DbError::decode(&self.id, format!("recurrence: {e}")))?;

        let duration = match self.end_date {
            Some(date) => TemplateDuration::EndDate { date },
            None => TemplateDuration::Indefinite,
        };

        Ok(StandingOrderTemplate {
            id: self.id,
            customer_id: self.customer_id,
            items,
            recurrence,
            duration,
            status: self.status,
            notes: self.notes,
            created_at: self.created_at,
            created_by: self.created_by,
            next_delivery_date: self.next_delivery_date,
        })
    }
}

const TEMPLATE_COLUMNS: &str = r#"
    id, customer_id, recurrence, end_date, status, notes,
    created_at, created_by, next_delivery_date
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for standing order templates.
#[derive(Debug, Clone)]
pub struct TemplateRepository {
    pool: SqlitePool,
}

impl TemplateRepository {
    /// Creates a new TemplateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TemplateRepository { pool }
    }

    /// Gets a template by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StandingOrderTemplate>> {
        let record = sqlx::query_as::<_, TemplateRecord>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM standing_order_templates WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, TemplateItemRecord>(
            r#"
            SELECT template_id, product_id, product_name, quantity, unit_price_paise
            FROM standing_order_items
            WHERE template_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(LineItem::from)
        .collect();

        record.into_template(items).map(Some)
    }

    /// Lists active templates, skipping rows that cannot be decoded.
    pub async fn list_active(&self) -> DbResult<Vec<StandingOrderTemplate>> {
        let records = sqlx::query_as::<_, TemplateRecord>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM standing_order_templates \
             WHERE status = 'active' ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let item_records = sqlx::query_as::<_, TemplateItemRecord>(
            r#"
            SELECT i.template_id, i.product_id, i.product_name, i.quantity, i.unit_price_paise
            FROM standing_order_items i
            JOIN standing_order_templates t ON t.id = i.template_id
            WHERE t.status = 'active'
            ORDER BY i.template_id, i.position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_template: HashMap<String, Vec<LineItem>> = HashMap::new();
        for record in item_records {
            items_by_template
                .entry(record.template_id.clone())
                .or_default()
                .push(record.into());
        }

        let mut templates = Vec::with_capacity(records.len());
        for record in records {
            let items = items_by_template.remove(&record.id).unwrap_or_default();
            let id = record.id.clone();
            match record.into_template(items) {
                Ok(template) => templates.push(template),
                Err(e) => {
                    error!(template_id = %id, error = %e, "Skipping undecodable standing order");
                }
            }
        }

        debug!(count = templates.len(), "Loaded active standing orders");
        Ok(templates)
    }

    /// Inserts a template and its items in one transaction.
    pub async fn insert_template(&self, template: &StandingOrderTemplate) -> DbResult<()> {
        debug!(id = %template.id, customer_id = %template.customer_id, "Inserting standing order");

        let recurrence = encode_recurrence(&template.recurrence)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO standing_order_templates (
                id, customer_id, recurrence, end_date, status, notes,
                created_at, created_by, next_delivery_date, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&template.id)
        .bind(&template.customer_id)
        .bind(&recurrence)
        .bind(template.duration.end_date())
        .bind(template.status)
        .bind(&template.notes)
        .bind(template.created_at)
        .bind(&template.created_by)
        .bind(template.next_delivery_date)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, &template.id, &template.items).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Overwrites a template row and replaces its items.
    pub async fn save_template(&self, template: &StandingOrderTemplate) -> DbResult<()> {
        let recurrence = encode_recurrence(&template.recurrence)?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE standing_order_templates SET
                customer_id = ?2,
                recurrence = ?3,
                end_date = ?4,
                status = ?5,
                notes = ?6,
                next_delivery_date = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&template.id)
        .bind(&template.customer_id)
        .bind(&recurrence)
        .bind(template.duration.end_date())
        .bind(template.status)
        .bind(&template.notes)
        .bind(template.next_delivery_date)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("template", &template.id));
        }

        sqlx::query("DELETE FROM standing_order_items WHERE template_id = ?1")
            .bind(&template.id)
            .execute(&mut *tx)
            .await?;
        insert_items(&mut tx, &template.id, &template.items).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Sets the lifecycle status.
    pub async fn set_status(&self, id: &str, status: TemplateStatus) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE standing_order_templates SET status = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("template", id));
        }
        Ok(())
    }

    /// Sets the advisory next delivery date.
    pub async fn set_next_delivery(&self, id: &str, date: Option<NaiveDate>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE standing_order_templates SET next_delivery_date = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(date)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("template", id));
        }
        Ok(())
    }

    /// Deletes a template. Items go with it via the cascade.
    pub async fn delete_template(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM standing_order_templates WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn encode_recurrence(recurrence: &Recurrence) -> DbResult<String> {
    serde_json::to_string(recurrence).map_err(|e| DbError::Internal(e.to_string()))
}

async fn insert_items(
    tx: &mut Transaction<'_, Sqlite>,
    template_id: &str,
    items: &[LineItem],
) -> DbResult<()> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO standing_order_items (
                template_id, position, product_id, product_name, quantity, unit_price_paise
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(template_id)
        .bind(position as i64)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price.paise())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

// =============================================================================
// TemplateStore
// =============================================================================

#[async_trait]
impl TemplateStore for TemplateRepository {
    async fn list_active(&self) -> StoreResult<Vec<StandingOrderTemplate>> {
        Ok(TemplateRepository::list_active(self).await?)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<StandingOrderTemplate>> {
        Ok(self.get_by_id(id).await?)
    }

    async fn insert(&self, template: &StandingOrderTemplate) -> StoreResult<()> {
        Ok(self.insert_template(template).await?)
    }

    async fn save(&self, template: &StandingOrderTemplate) -> StoreResult<()> {
        Ok(self.save_template(template).await?)
    }

    async fn update_status(&self, id: &str, status: TemplateStatus) -> StoreResult<()> {
        Ok(self.set_status(id, status).await?)
    }

    async fn update_next_delivery(&self, id: &str, date: Option<NaiveDate>) -> StoreResult<()> {
        Ok(self.set_next_delivery(id, date).await?)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.delete_template(id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
