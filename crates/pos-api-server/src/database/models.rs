use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Raw menu row as stored. `ingredients` is a backslash-delimited list of
/// inventory ids (legacy format, parsed by `orders::encoding`).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MenuRow {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub ingredients: Option<String>,
    pub drink_order: i32,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InventoryRow {
    pub id: i32,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// One settled order in sales_history. `cart` is a backslash-delimited list
/// of menu ids, one per line item.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SaleRow {
    pub id: i64,
    pub cashier: i32,
    pub sale_week: i32,
    pub sale_date: NaiveDate,
    pub current_hour: String,
    pub payment: String,
    pub cart: String,
    pub order_total: Decimal,
}

/// Insert payload for sales_history.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub cashier: i32,
    pub sale_week: i32,
    pub sale_date: NaiveDate,
    pub current_hour: String,
    pub payment: String,
    pub cart: String,
    pub order_total: Decimal,
}
