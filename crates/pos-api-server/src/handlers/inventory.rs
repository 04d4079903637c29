use crate::audit::{AuditEntry, AuditLogger, AuditStatus, AuditType};
use crate::catalog::CatalogCache;
use crate::database::{InventoryRow, Repository};
use crate::handlers::menu::refresh_after_mutation;
use crate::utils::error::ApiError;
use axum::{extract::Extension, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub async fn get_inventory(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<Vec<InventoryRow>>, ApiError> {
    let rows = repository
        .fetch_inventory()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct AddInventoryItemRequest {
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

pub async fn add_inventory_item(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<AddInventoryItemRequest>,
) -> Result<StatusCode, ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "inventory item name must not be empty".to_string(),
        ));
    }

    repository
        .add_inventory_item(&request.name, request.price, request.quantity)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    info!("Added inventory item '{}'", request.name);
    audit.log(
        AuditEntry::new(AuditType::InventoryMutated, AuditStatus::Success)
            .subject(request.name.clone())
            .detail(json!({ "op": "add", "quantity": request.quantity })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct DeleteInventoryItemRequest {
    pub id: i32,
}

pub async fn delete_inventory_item(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<DeleteInventoryItemRequest>,
) -> Result<StatusCode, ApiError> {
    repository
        .delete_inventory_item(request.id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    audit.log(
        AuditEntry::new(AuditType::InventoryMutated, AuditStatus::Success)
            .subject(request.id.to_string())
            .detail(json!({ "op": "delete" })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct UpdateInventoryItemNameRequest {
    pub id: i32,
    pub name: String,
}

pub async fn update_inventory_item_name(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<UpdateInventoryItemNameRequest>,
) -> Result<StatusCode, ApiError> {
    repository
        .update_inventory_name(request.id, &request.name)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    audit.log(
        AuditEntry::new(AuditType::InventoryMutated, AuditStatus::Success)
            .subject(request.id.to_string())
            .detail(json!({ "op": "update_name", "name": request.name })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct UpdateInventoryItemQuantityRequest {
    pub id: i32,
    pub quantity: i32,
}

pub async fn update_inventory_item_quantity(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<UpdateInventoryItemQuantityRequest>,
) -> Result<StatusCode, ApiError> {
    repository
        .update_inventory_quantity(request.id, request.quantity)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    audit.log(
        AuditEntry::new(AuditType::InventoryMutated, AuditStatus::Success)
            .subject(request.id.to_string())
            .detail(json!({ "op": "update_quantity", "quantity": request.quantity })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct UpdateInventoryItemPriceRequest {
    pub id: i32,
    pub price: Decimal,
}

pub async fn update_inventory_item_price(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<UpdateInventoryItemPriceRequest>,
) -> Result<StatusCode, ApiError> {
    repository
        .update_inventory_price(request.id, request.price)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    audit.log(
        AuditEntry::new(AuditType::InventoryMutated, AuditStatus::Success)
            .subject(request.id.to_string())
            .detail(json!({ "op": "update_price", "price": request.price })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}
