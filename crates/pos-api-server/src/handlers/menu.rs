use crate::audit::{AuditEntry, AuditLogger, AuditStatus, AuditType};
use crate::catalog::CatalogCache;
use crate::database::{MenuRow, Repository};
use crate::orders::encoding::{parse_ingredient_ids_strict, ID_SEPARATOR};
use crate::utils::error::ApiError;
use axum::{extract::Extension, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn get_menu(
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<Vec<MenuRow>>, ApiError> {
    let rows = repository
        .fetch_menu()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(rows))
}

/// A menu id ends up inside backslash-joined cart strings, so the separator
/// can never be part of one.
fn validate_menu_id(id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest("menu id must not be empty".to_string()));
    }
    if id.contains(ID_SEPARATOR) {
        return Err(ApiError::BadRequest(format!(
            "menu id '{}' contains the reserved separator character",
            id
        )));
    }
    Ok(())
}

fn validate_ingredients(ingredients: &str) -> Result<(), ApiError> {
    parse_ingredient_ids_strict(ingredients)
        .map(|_| ())
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Reload the catalog snapshot after a successful write. The mutation
/// already committed, so a refresh failure only leaves the snapshot stale.
pub(crate) async fn refresh_after_mutation(
    catalog: &CatalogCache,
    repository: &Repository,
    audit: &AuditLogger,
) {
    if let Err(e) = catalog.refresh(repository).await {
        warn!("Catalog refresh after mutation failed: {}", e);
        audit.log(
            AuditEntry::new(AuditType::CatalogRefreshFailed, AuditStatus::Warning)
                .detail(json!({ "error": e.to_string() })),
        );
    }
}

#[derive(Debug, Deserialize)]
pub struct AddMenuDrinkRequest {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub ingredients: Option<String>,
}

pub async fn add_menu_drink(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<AddMenuDrinkRequest>,
) -> Result<StatusCode, ApiError> {
    validate_menu_id(&request.id)?;
    if let Some(ingredients) = &request.ingredients {
        validate_ingredients(ingredients)?;
    }

    repository
        .add_menu_drink(
            &request.id,
            &request.name,
            request.price,
            request.ingredients.as_deref(),
        )
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    info!("Added menu drink '{}' ({})", request.name, request.id);
    audit.log(
        AuditEntry::new(AuditType::MenuMutated, AuditStatus::Success)
            .subject(request.id.clone())
            .detail(json!({ "op": "add", "name": request.name })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct DeleteMenuDrinkRequest {
    pub id: String,
}

pub async fn delete_menu_drink(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<DeleteMenuDrinkRequest>,
) -> Result<StatusCode, ApiError> {
    repository
        .delete_menu_drink(&request.id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    audit.log(
        AuditEntry::new(AuditType::MenuMutated, AuditStatus::Success)
            .subject(request.id.clone())
            .detail(json!({ "op": "delete" })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct UpdateMenuDrinkIdRequest {
    pub id: String,
    #[serde(rename = "newID")]
    pub new_id: String,
}

pub async fn update_menu_drink_id(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<UpdateMenuDrinkIdRequest>,
) -> Result<StatusCode, ApiError> {
    validate_menu_id(&request.new_id)?;

    repository
        .update_menu_id(&request.id, &request.new_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    audit.log(
        AuditEntry::new(AuditType::MenuMutated, AuditStatus::Success)
            .subject(request.id.clone())
            .detail(json!({ "op": "update_id", "new_id": request.new_id })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct UpdateMenuDrinkNameRequest {
    pub id: String,
    pub name: String,
}

pub async fn update_menu_drink_name(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<UpdateMenuDrinkNameRequest>,
) -> Result<StatusCode, ApiError> {
    repository
        .update_menu_name(&request.id, &request.name)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    audit.log(
        AuditEntry::new(AuditType::MenuMutated, AuditStatus::Success)
            .subject(request.id.clone())
            .detail(json!({ "op": "update_name", "name": request.name })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct UpdateMenuDrinkPriceRequest {
    pub id: String,
    pub price: Decimal,
}

pub async fn update_menu_drink_price(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<UpdateMenuDrinkPriceRequest>,
) -> Result<StatusCode, ApiError> {
    repository
        .update_menu_price(&request.id, request.price)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    audit.log(
        AuditEntry::new(AuditType::MenuMutated, AuditStatus::Success)
            .subject(request.id.clone())
            .detail(json!({ "op": "update_price", "price": request.price })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct UpdateMenuDrinkIngredientsRequest {
    pub id: String,
    pub ingredients: String,
}

pub async fn update_menu_drink_ingredients(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(catalog): Extension<Arc<CatalogCache>>,
    Extension(audit): Extension<Arc<AuditLogger>>,
    Json(request): Json<UpdateMenuDrinkIngredientsRequest>,
) -> Result<StatusCode, ApiError> {
    validate_ingredients(&request.ingredients)?;

    repository
        .update_menu_ingredients(&request.id, &request.ingredients)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    audit.log(
        AuditEntry::new(AuditType::MenuMutated, AuditStatus::Success)
            .subject(request.id.clone())
            .detail(json!({ "op": "update_ingredients" })),
    );

    refresh_after_mutation(&catalog, &repository, &audit).await;
    Ok(StatusCode::OK)
}
