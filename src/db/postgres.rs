use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use super::{conflict, InventoryStore};
use crate::error::{AppError, AppResult};
use crate::models::*;

/// [`InventoryStore`] over a Postgres connection pool. Every call checks a
/// connection out of the pool for the duration of a single statement.
#[derive(Debug, Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn create(&self, new: &NewInventory) -> AppResult<InventoryRecord> {
        info!(product_id = new.product_id, condition = %new.condition, "Creating inventory");

        sqlx::query_as::<_, InventoryRecord>(
            r#"
            INSERT INTO inventory (product_id, condition, quantity, restock_level, can_update)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING product_id, condition, quantity, restock_level, last_updated_on, can_update
            "#,
        )
        .bind(new.product_id)
        .bind(new.condition)
        .bind(new.quantity)
        .bind(new.restock_level)
        .bind(new.can_update)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => conflict(new.key()),
            other => AppError::Database(other),
        })
    }

    async fn find(&self, key: InventoryKey) -> AppResult<Option<InventoryRecord>> {
        debug!(product_id = key.product_id, condition = %key.condition, "Looking up inventory");

        let record = sqlx::query_as::<_, InventoryRecord>(
            "SELECT product_id, condition, quantity, restock_level, last_updated_on, can_update
             FROM inventory WHERE product_id = $1 AND condition = $2",
        )
        .bind(key.product_id)
        .bind(key.condition)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn all(&self) -> AppResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(
            "SELECT product_id, condition, quantity, restock_level, last_updated_on, can_update
             FROM inventory ORDER BY product_id, condition",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_by_condition(&self, condition: Condition) -> AppResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(
            "SELECT product_id, condition, quantity, restock_level, last_updated_on, can_update
             FROM inventory WHERE condition = $1 ORDER BY product_id",
        )
        .bind(condition)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn find_restock_needed(&self) -> AppResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(
            "SELECT product_id, condition, quantity, restock_level, last_updated_on, can_update
             FROM inventory WHERE quantity < restock_level ORDER BY product_id, condition",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn update(
        &self,
        key: InventoryKey,
        changes: &InventoryUpdate,
    ) -> AppResult<Option<InventoryRecord>> {
        info!(
            product_id = key.product_id,
            condition = %key.condition,
            quantity = ?changes.quantity,
            restock_level = ?changes.restock_level,
            "Updating inventory"
        );

        let updated = sqlx::query_as::<_, InventoryRecord>(
            r#"
            UPDATE inventory
            SET quantity        = COALESCE($3, quantity),
                restock_level   = COALESCE($4, restock_level),
                last_updated_on = NOW()
            WHERE product_id = $1 AND condition = $2 AND can_update = 'ENABLED'
            RETURNING product_id, condition, quantity, restock_level, last_updated_on, can_update
            "#,
        )
        .bind(key.product_id)
        .bind(key.condition)
        .bind(changes.quantity)
        .bind(changes.restock_level)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn set_update_status(
        &self,
        key: InventoryKey,
        status: UpdateStatus,
    ) -> AppResult<Option<InventoryRecord>> {
        info!(product_id = key.product_id, condition = %key.condition, can_update = %status, "Setting update status");

        let updated = sqlx::query_as::<_, InventoryRecord>(
            r#"
            UPDATE inventory
            SET can_update = $3, last_updated_on = NOW()
            WHERE product_id = $1 AND condition = $2
            RETURNING product_id, condition, quantity, restock_level, last_updated_on, can_update
            "#,
        )
        .bind(key.product_id)
        .bind(key.condition)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete(&self, key: InventoryKey) -> AppResult<bool> {
        info!(product_id = key.product_id, condition = %key.condition, "Deleting inventory");

        let result = sqlx::query("DELETE FROM inventory WHERE product_id = $1 AND condition = $2")
            .bind(key.product_id)
            .bind(key.condition)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_all(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM inventory")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
