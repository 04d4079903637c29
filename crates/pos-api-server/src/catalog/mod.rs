mod cache;

pub use cache::{CatalogCache, InventoryItem, MenuItem};
