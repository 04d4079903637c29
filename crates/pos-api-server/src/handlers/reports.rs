use crate::database::{InventoryRow, MenuRow, Repository, SaleRow};
use crate::orders::encoding::{decode_ids, parse_ingredient_ids};
use crate::utils::error::ApiError;
use axum::{extract::Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct RestockReportRequest {
    pub amount: i32,
}

/// Inventory rows at or below the requested stock threshold.
pub async fn restock_report(
    Extension(repository): Extension<Arc<Repository>>,
    Json(request): Json<RestockReportRequest>,
) -> Result<Json<Vec<InventoryRow>>, ApiError> {
    let rows = repository
        .restock_report(request.amount)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    info!(
        "Restock report: {} items at or below {}",
        rows.len(),
        request.amount
    );

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct SalesReportRequest {
    #[serde(rename = "firstDate")]
    pub first_date: NaiveDate,
    #[serde(rename = "secondDate")]
    pub second_date: NaiveDate,
}

pub async fn sales_report(
    Extension(repository): Extension<Arc<Repository>>,
    Json(request): Json<SalesReportRequest>,
) -> Result<Json<Vec<SaleRow>>, ApiError> {
    let rows = repository
        .sales_report(request.first_date, request.second_date)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct ExcessReportRequest {
    #[serde(rename = "firstDate")]
    pub first_date: NaiveDate,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ExcessItem {
    pub id: i32,
    pub name: String,
    pub quantity: i32,
    pub times_used: i64,
}

#[derive(Debug, Serialize)]
pub struct ExcessReportResponse {
    pub items: Vec<ExcessItem>,
}

/// Inventory items whose usage since `firstDate` stayed under 10% of their
/// current stocked quantity. Usage counts one unit per ingredient occurrence
/// in every sold cart.
pub async fn excess_report(
    Extension(repository): Extension<Arc<Repository>>,
    Json(request): Json<ExcessReportRequest>,
) -> Result<Json<ExcessReportResponse>, ApiError> {
    let today = Utc::now().date_naive();
    let sales = repository
        .sales_report(request.first_date, today)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
    let menu = repository
        .fetch_menu()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
    let inventory = repository
        .fetch_inventory()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    let items = compute_excess(&sales, &menu, inventory);

    Ok(Json(ExcessReportResponse { items }))
}

fn compute_excess(
    sales: &[SaleRow],
    menu: &[MenuRow],
    inventory: Vec<InventoryRow>,
) -> Vec<ExcessItem> {
    let recipes: HashMap<&str, Vec<i32>> = menu
        .iter()
        .map(|row| {
            (
                row.id.as_str(),
                row.ingredients
                    .as_deref()
                    .map(parse_ingredient_ids)
                    .unwrap_or_default(),
            )
        })
        .collect();

    let mut usage: HashMap<i32, i64> = inventory.iter().map(|row| (row.id, 0)).collect();

    for sale in sales {
        for menu_id in decode_ids(&sale.cart) {
            if let Some(ingredients) = recipes.get(menu_id.as_str()) {
                for ingredient_id in ingredients {
                    *usage.entry(*ingredient_id).or_insert(0) += 1;
                }
            }
        }
    }

    inventory
        .into_iter()
        .filter_map(|row| {
            let times_used = usage.get(&row.id).copied().unwrap_or(0);
            // Strictly under 10% of current stock, in integer arithmetic.
            if times_used * 10 < row.quantity as i64 {
                Some(ExcessItem {
                    id: row.id,
                    name: row.name,
                    quantity: row.quantity,
                    times_used,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn menu_row(id: &str, ingredients: Option<&str>) -> MenuRow {
        MenuRow {
            id: id.to_string(),
            name: id.to_string(),
            price: Decimal::new(350, 2),
            ingredients: ingredients.map(str::to_string),
            drink_order: 0,
        }
    }

    fn inventory_row(id: i32, quantity: i32) -> InventoryRow {
        InventoryRow {
            id,
            name: format!("item-{}", id),
            quantity,
            price: Decimal::new(25, 2),
        }
    }

    fn sale_row(cart: &str) -> SaleRow {
        SaleRow {
            id: 1,
            cashier: 1,
            sale_week: 1,
            sale_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            current_hour: "1000".to_string(),
            payment: "Cash".to_string(),
            cart: cart.to_string(),
            order_total: Decimal::new(700, 2),
        }
    }

    #[test]
    fn test_under_ten_percent_usage_is_excess() {
        let menu = vec![menu_row("M1", Some("3"))];
        let inventory = vec![inventory_row(3, 100)];
        // Nine uses against a stock of 100: 9 * 10 < 100.
        let sales: Vec<SaleRow> = (0..9).map(|_| sale_row("M1")).collect();

        let items = compute_excess(&sales, &menu, inventory);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].times_used, 9);
    }

    #[test]
    fn test_exactly_ten_percent_usage_is_not_excess() {
        let menu = vec![menu_row("M1", Some("3"))];
        let inventory = vec![inventory_row(3, 100)];
        let sales: Vec<SaleRow> = (0..10).map(|_| sale_row("M1")).collect();

        assert!(compute_excess(&sales, &menu, inventory).is_empty());
    }

    #[test]
    fn test_unused_item_with_zero_stock_is_not_excess() {
        let menu = vec![menu_row("M1", Some("3"))];
        let inventory = vec![inventory_row(3, 0)];

        // 0 * 10 < 0 is false; empty stock never reports as excess.
        assert!(compute_excess(&[], &menu, inventory).is_empty());
    }

    #[test]
    fn test_multi_item_cart_counts_each_recipe() {
        let menu = vec![menu_row("M1", Some("3\\7")), menu_row("M2", Some("3"))];
        let inventory = vec![inventory_row(3, 10), inventory_row(7, 100)];
        let sales = vec![sale_row("M1\\M2"), sale_row("M2")];

        let items = compute_excess(&sales, &menu, inventory);
        // Ingredient 3 used 3 times against stock 10: not excess.
        // Ingredient 7 used once against stock 100: excess.
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 7);
        assert_eq!(items[0].times_used, 1);
    }

    #[test]
    fn test_unknown_menu_ids_in_cart_are_ignored() {
        let menu = vec![menu_row("M1", Some("3"))];
        let inventory = vec![inventory_row(3, 50)];
        let sales = vec![sale_row("GONE\\M1")];

        let items = compute_excess(&sales, &menu, inventory);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].times_used, 1);
    }
}
