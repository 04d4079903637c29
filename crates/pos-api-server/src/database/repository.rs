use super::{DbPool, InventoryRow, MenuRow, NewSale, SaleRow};
use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

pub struct Repository {
    pub pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // ===== Catalog reads =====

    pub async fn fetch_menu(&self) -> Result<Vec<MenuRow>> {
        let rows = sqlx::query_as::<_, MenuRow>("SELECT * FROM menu ORDER BY drink_order")
            .fetch_all(self.pool.get_pool())
            .await?;

        debug!("Fetched {} menu rows", rows.len());

        Ok(rows)
    }

    pub async fn fetch_inventory(&self) -> Result<Vec<InventoryRow>> {
        let rows = sqlx::query_as::<_, InventoryRow>("SELECT * FROM inventory ORDER BY id")
            .fetch_all(self.pool.get_pool())
            .await?;

        debug!("Fetched {} inventory rows", rows.len());

        Ok(rows)
    }

    // ===== Sales =====

    pub async fn submit_order(&self, sale: &NewSale) -> Result<()> {
        sqlx::query(
            "INSERT INTO sales_history (cashier, sale_week, sale_date, current_hour, payment, cart, order_total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(sale.cashier)
        .bind(sale.sale_week)
        .bind(sale.sale_date)
        .bind(&sale.current_hour)
        .bind(&sale.payment)
        .bind(&sale.cart)
        .bind(sale.order_total)
        .execute(self.pool.get_pool())
        .await?;

        Ok(())
    }

    pub async fn fetch_order_history(&self, limit: i64) -> Result<Vec<SaleRow>> {
        let rows = sqlx::query_as::<_, SaleRow>(
            "SELECT * FROM sales_history ORDER BY id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(rows)
    }

    // ===== Inventory mutations (stored-function wrappers) =====

    pub async fn add_inventory_item(
        &self,
        name: &str,
        price: Decimal,
        quantity: i32,
    ) -> Result<()> {
        sqlx::query("SELECT insert_inventory($1, $2, $3)")
            .bind(name)
            .bind(price)
            .bind(quantity)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    pub async fn delete_inventory_item(&self, id: i32) -> Result<()> {
        sqlx::query("SELECT delete_inventory($1)")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    pub async fn update_inventory_name(&self, id: i32, name: &str) -> Result<()> {
        sqlx::query("SELECT update_inventory_name($1, $2)")
            .bind(id)
            .bind(name)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    pub async fn update_inventory_quantity(&self, id: i32, quantity: i32) -> Result<()> {
        sqlx::query("SELECT update_inventory_quantity($1, $2)")
            .bind(id)
            .bind(quantity)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    pub async fn update_inventory_price(&self, id: i32, price: Decimal) -> Result<()> {
        sqlx::query("SELECT update_inventory_price($1, $2)")
            .bind(id)
            .bind(price)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    // ===== Menu mutations =====

    pub async fn add_menu_drink(
        &self,
        id: &str,
        name: &str,
        price: Decimal,
        ingredients: Option<&str>,
    ) -> Result<()> {
        sqlx::query("INSERT INTO menu (id, name, price, ingredients) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(name)
            .bind(price)
            .bind(ingredients)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    pub async fn delete_menu_drink(&self, id: &str) -> Result<()> {
        sqlx::query("SELECT delete_menu($1)")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    pub async fn update_menu_id(&self, id: &str, new_id: &str) -> Result<()> {
        sqlx::query("SELECT update_menu_id($1, $2)")
            .bind(id)
            .bind(new_id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    pub async fn update_menu_name(&self, id: &str, name: &str) -> Result<()> {
        sqlx::query("SELECT update_menu_name($1, $2)")
            .bind(id)
            .bind(name)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    pub async fn update_menu_price(&self, id: &str, price: Decimal) -> Result<()> {
        sqlx::query("SELECT update_menu_price($1, $2)")
            .bind(id)
            .bind(price)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    pub async fn update_menu_ingredients(&self, id: &str, ingredients: &str) -> Result<()> {
        sqlx::query("UPDATE menu SET ingredients = $2 WHERE id = $1")
            .bind(id)
            .bind(ingredients)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    // ===== Reports =====

    pub async fn restock_report(&self, amount: i32) -> Result<Vec<InventoryRow>> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            "SELECT * FROM inventory WHERE quantity <= $1 ORDER BY id",
        )
        .bind(amount)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(rows)
    }

    pub async fn sales_report(
        &self,
        first_date: NaiveDate,
        second_date: NaiveDate,
    ) -> Result<Vec<SaleRow>> {
        let rows = sqlx::query_as::<_, SaleRow>(
            "SELECT * FROM sales_history WHERE sale_date BETWEEN $1 AND $2 ORDER BY id DESC",
        )
        .bind(first_date)
        .bind(second_date)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(rows)
    }
}
