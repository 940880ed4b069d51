//! Persistence adapter for inventory records.
//!
//! Handlers only see [`InventoryStore`]; `main` wires in [`PgInventoryStore`]
//! and tests swap in an in-memory implementation.

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::models::*;

#[cfg(test)]
pub mod memory;
mod postgres;

pub use postgres::PgInventoryStore;

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Inserts a new row. A duplicate (product_id, condition) yields [`AppError::Conflict`].
    async fn create(&self, new: &NewInventory) -> AppResult<InventoryRecord>;

    async fn find(&self, key: InventoryKey) -> AppResult<Option<InventoryRecord>>;

    async fn all(&self) -> AppResult<Vec<InventoryRecord>>;

    async fn find_by_condition(&self, condition: Condition) -> AppResult<Vec<InventoryRecord>>;

    /// Rows whose quantity is below their restock level.
    async fn find_restock_needed(&self) -> AppResult<Vec<InventoryRecord>>;

    /// Applies `changes` to quantity and restock level, stamping `last_updated_on`,
    /// only while the row is ENABLED. The lock check and the write are one atomic
    /// step; `can_update` is never written here.
    ///
    /// Returns `None` when the row is absent or locked.
    async fn update(
        &self,
        key: InventoryKey,
        changes: &InventoryUpdate,
    ) -> AppResult<Option<InventoryRecord>>;

    async fn set_update_status(
        &self,
        key: InventoryKey,
        status: UpdateStatus,
    ) -> AppResult<Option<InventoryRecord>>;

    /// Returns whether a row was removed.
    async fn delete(&self, key: InventoryKey) -> AppResult<bool>;

    async fn remove_all(&self) -> AppResult<u64>;

    async fn fetch(&self, key: InventoryKey) -> AppResult<InventoryRecord> {
        self.find(key).await?.ok_or_else(|| not_found(key))
    }

    async fn list(&self, filter: Option<InventoryFilter>) -> AppResult<Vec<InventoryRecord>> {
        match filter {
            None => self.all().await,
            Some(InventoryFilter::Condition(condition)) => self.find_by_condition(condition).await,
            Some(InventoryFilter::Restock) => self.find_restock_needed().await,
        }
    }
}

pub fn not_found(key: InventoryKey) -> AppError {
    AppError::NotFound(format!(
        "Inventory with product_id '{}' and condition '{}' was not found.",
        key.product_id, key.condition
    ))
}

pub fn conflict(key: InventoryKey) -> AppError {
    AppError::Conflict(format!(
        "Primary key conflict: {} key pair already exists in database",
        key
    ))
}
