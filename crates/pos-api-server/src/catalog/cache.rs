use crate::database::{InventoryRow, MenuRow, Repository};
use crate::orders::encoding::parse_ingredient_ids;
use anyhow::Result;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Menu item with its ingredient list already parsed out of the legacy
/// delimited column.
#[derive(Debug, Clone)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub ingredient_ids: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct InventoryItem {
    pub id: i32,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<&MenuRow> for MenuItem {
    fn from(row: &MenuRow) -> Self {
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            price: row.price,
            ingredient_ids: row
                .ingredients
                .as_deref()
                .map(parse_ingredient_ids)
                .unwrap_or_default(),
        }
    }
}

impl From<&InventoryRow> for InventoryItem {
    fn from(row: &InventoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            quantity: row.quantity,
            price: row.price,
        }
    }
}

/// In-memory snapshot of the menu and inventory lists.
///
/// There is no timer refresh: the snapshot is loaded once at startup and
/// re-loaded after a successful catalog mutation. A lookup miss is a
/// user-facing "not found" condition, never a panic.
pub struct CatalogCache {
    menu: RwLock<Arc<Vec<MenuItem>>>,
    inventory: RwLock<Arc<Vec<InventoryItem>>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            menu: RwLock::new(Arc::new(Vec::new())),
            inventory: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Reload both lists from the database and swap the snapshot. On failure
    /// the previous snapshot stays in place and the error propagates.
    pub async fn refresh(&self, repository: &Repository) -> Result<()> {
        let menu_rows = repository.fetch_menu().await?;
        let inventory_rows = repository.fetch_inventory().await?;

        let menu: Vec<MenuItem> = menu_rows.iter().map(MenuItem::from).collect();
        let inventory: Vec<InventoryItem> =
            inventory_rows.iter().map(InventoryItem::from).collect();

        info!(
            "Catalog refreshed: {} menu items, {} inventory items",
            menu.len(),
            inventory.len()
        );

        *self.menu.write() = Arc::new(menu);
        *self.inventory.write() = Arc::new(inventory);

        Ok(())
    }

    pub fn find_menu_item(&self, id: &str) -> Option<MenuItem> {
        let item = self.menu.read().iter().find(|item| item.id == id).cloned();
        if item.is_none() {
            debug!("Menu item '{}' not in catalog snapshot", id);
        }
        item
    }

    pub fn find_inventory_item(&self, id: i32) -> Option<InventoryItem> {
        self.inventory
            .read()
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    pub fn menu_snapshot(&self) -> Arc<Vec<MenuItem>> {
        self.menu.read().clone()
    }

    pub fn inventory_snapshot(&self) -> Arc<Vec<InventoryItem>> {
        self.inventory.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.menu.read().is_empty() && self.inventory.read().is_empty()
    }

    /// Test/seed helper: install a snapshot without a database round-trip.
    pub fn install(&self, menu: Vec<MenuItem>, inventory: Vec<InventoryItem>) {
        *self.menu.write() = Arc::new(menu);
        *self.inventory.write() = Arc::new(inventory);
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}
