//! In-process [`InventoryStore`] used by the HTTP tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{conflict, InventoryStore};
use crate::error::AppResult;
use crate::models::*;

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<InventoryKey, InventoryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn select(&self, pred: impl Fn(&InventoryRecord) -> bool) -> Vec<InventoryRecord> {
        self.rows
            .read()
            .await
            .values()
            .filter(|r| pred(*r))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn create(&self, new: &NewInventory) -> AppResult<InventoryRecord> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&new.key()) {
            return Err(conflict(new.key()));
        }
        let record = InventoryRecord {
            product_id: new.product_id,
            condition: new.condition,
            quantity: new.quantity,
            restock_level: new.restock_level,
            last_updated_on: Utc::now(),
            can_update: new.can_update,
        };
        rows.insert(record.key(), record.clone());
        Ok(record)
    }

    async fn find(&self, key: InventoryKey) -> AppResult<Option<InventoryRecord>> {
        Ok(self.rows.read().await.get(&key).cloned())
    }

    async fn all(&self) -> AppResult<Vec<InventoryRecord>> {
        Ok(self.select(|_| true).await)
    }

    async fn find_by_condition(&self, condition: Condition) -> AppResult<Vec<InventoryRecord>> {
        Ok(self.select(|r| r.condition == condition).await)
    }

    async fn find_restock_needed(&self) -> AppResult<Vec<InventoryRecord>> {
        Ok(self.select(InventoryRecord::needs_restock).await)
    }

    async fn update(
        &self,
        key: InventoryKey,
        changes: &InventoryUpdate,
    ) -> AppResult<Option<InventoryRecord>> {
        let mut rows = self.rows.write().await;
        Ok(rows
            .get_mut(&key)
            .filter(|row| row.is_update_enabled())
            .map(|row| {
                changes.apply_to(row);
                row.last_updated_on = Utc::now();
                row.clone()
            }))
    }

    async fn set_update_status(
        &self,
        key: InventoryKey,
        status: UpdateStatus,
    ) -> AppResult<Option<InventoryRecord>> {
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(&key).map(|row| {
            row.can_update = status;
            row.last_updated_on = Utc::now();
            row.clone()
        }))
    }

    async fn delete(&self, key: InventoryKey) -> AppResult<bool> {
        Ok(self.rows.write().await.remove(&key).is_some())
    }

    async fn remove_all(&self) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let removed = rows.len() as u64;
        rows.clear();
        Ok(removed)
    }
}
