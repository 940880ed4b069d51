use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::{
    db,
    error::{AppError, AppResult},
    models::*,
    AppState,
};

/// Composite key taken from `/inventory/:id/:condition[/active]`.
///
/// Both segments are validated here so every keyed handler answers a bad
/// condition name or a non-numeric id with 400 before touching the store.
pub struct KeyPath(pub InventoryKey);

#[async_trait]
impl<S> FromRequestParts<S> for KeyPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((id, condition)) = Path::<(String, String)>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let product_id = id
            .parse::<i32>()
            .map_err(|_| AppError::BadRequest(format!("Invalid product_id: {id}")))?;
        let condition = condition
            .parse::<Condition>()
            .map_err(|_| AppError::BadRequest(format!("Invalid Condition Type: {condition}")))?;

        Ok(KeyPath(InventoryKey::new(product_id, condition)))
    }
}

fn parse_filter(token: &str) -> AppResult<InventoryFilter> {
    token
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid filter: {token}")))
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> AppResult<(StatusCode, Json<Vec<InventoryRecord>>)> {
    let filter = query.filter.as_deref().map(parse_filter).transpose()?;
    let records = state.store.list(filter).await?;

    info!(count = records.len(), filter = ?filter, "Listed inventory");

    Ok((StatusCode::OK, Json(records)))
}

/// `GET /inventory/:token` where the token is a condition name or `RESTOCK`.
pub async fn list_inventory_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<(StatusCode, Json<Vec<InventoryRecord>>)> {
    let filter = parse_filter(&token)?;
    let records = state.store.list(Some(filter)).await?;

    info!(count = records.len(), filter = ?filter, "Listed inventory");

    Ok((StatusCode::OK, Json(records)))
}

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_inventory(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, [(header::HeaderName, String); 1], Json<InventoryRecord>)> {
    let Json(body) = payload?;
    let new = NewInventory::from_json(&body)?;
    let record = state.store.create(&new).await?;

    info!(
        product_id = record.product_id,
        condition = %record.condition,
        "Inventory created"
    );

    let location = format!("/inventory/{}/{}", record.product_id, record.condition);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(record)))
}

// ── Read ──────────────────────────────────────────────────────────────────────

pub async fn get_inventory(
    State(state): State<AppState>,
    KeyPath(key): KeyPath,
) -> AppResult<(StatusCode, Json<InventoryRecord>)> {
    let record = state.store.fetch(key).await?;

    info!(product_id = key.product_id, condition = %key.condition, "Fetched inventory");

    Ok((StatusCode::OK, Json(record)))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_inventory(
    State(state): State<AppState>,
    KeyPath(key): KeyPath,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<InventoryRecord>)> {
    let Json(body) = payload?;
    let update = InventoryUpdate::from_json(&body)?;

    let record = match state.store.update(key, &update).await? {
        Some(record) => record,
        // The lock is checked by the store in the same statement as the write,
        // so a miss means the row is either gone or DISABLED.
        None => {
            state.store.fetch(key).await?;
            return Err(AppError::BadRequest(format!(
                "Inventory {} is disabled for updates",
                key
            )));
        }
    };

    info!(
        product_id = key.product_id,
        condition = %key.condition,
        quantity = record.quantity,
        restock_level = record.restock_level,
        "Inventory updated"
    );

    Ok((StatusCode::OK, Json(record)))
}

// ── Delete ────────────────────────────────────────────────────────────────────

/// Always 204: removing an absent record is not an error.
pub async fn delete_inventory(
    State(state): State<AppState>,
    KeyPath(key): KeyPath,
) -> AppResult<StatusCode> {
    let removed = state.store.delete(key).await?;

    info!(product_id = key.product_id, condition = %key.condition, removed, "Inventory deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ── Update lock ───────────────────────────────────────────────────────────────

pub async fn enable_updates(
    State(state): State<AppState>,
    KeyPath(key): KeyPath,
) -> AppResult<(StatusCode, Json<InventoryRecord>)> {
    let record = state
        .store
        .set_update_status(key, UpdateStatus::Enabled)
        .await?
        .ok_or_else(|| db::not_found(key))?;

    info!(product_id = key.product_id, condition = %key.condition, "Updates enabled");

    Ok((StatusCode::OK, Json(record)))
}

pub async fn disable_updates(
    State(state): State<AppState>,
    KeyPath(key): KeyPath,
) -> AppResult<StatusCode> {
    state
        .store
        .set_update_status(key, UpdateStatus::Disabled)
        .await?
        .ok_or_else(|| db::not_found(key))?;

    info!(product_id = key.product_id, condition = %key.condition, "Updates disabled");

    Ok(StatusCode::NO_CONTENT)
}
