use crate::catalog::{CatalogCache, MenuItem};
use crate::orders::customization::CustomizationStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CartError {
    #[error("menu item '{0}' could not be added to the order as it does not exist")]
    MenuItemNotFound(String),

    #[error("no line item at index {0}")]
    LineOutOfRange(usize),

    #[error("line item at index {index} is not menu item '{menu_item_id}'")]
    LineMismatch { index: usize, menu_item_id: String },

    #[error("quantity must be at least 1")]
    InvalidQuantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityDirection {
    Increment,
    Decrement,
}

/// One cart row: a quantity of a single menu item plus its customization
/// notes. `price` is the extended price (unit price x quantity).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub menu_item_id: String,
    pub quantity: u32,
    pub price: Decimal,
    pub notes: String,
}

/// Accumulates line items for one open order.
///
/// Merge rule: two additions collapse into one line iff they are the same
/// menu item AND carry an identical notes string. Plain items therefore
/// always merge, and identically-customized items merge too.
#[derive(Debug, Default)]
pub struct CartBuilder {
    lines: Vec<LineItem>,
}

impl CartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total item count across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of line prices, full precision.
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|line| line.price).sum()
    }

    /// Total rounded for display.
    pub fn display_total(&self) -> Decimal {
        self.total().round_dp(2)
    }

    /// Resolve the menu item, derive its notes from the current
    /// customization selection, then merge or append. Consumes the item's
    /// selection on success so nothing leaks into the next dialog.
    pub fn add_item(
        &mut self,
        catalog: &CatalogCache,
        selection: &mut CustomizationStore,
        menu_item_id: &str,
        quantity: u32,
    ) -> Result<&LineItem, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let item = catalog
            .find_menu_item(menu_item_id)
            .ok_or_else(|| CartError::MenuItemNotFound(menu_item_id.to_string()))?;

        let notes = build_notes(catalog, selection, &item);
        selection.reset_item(menu_item_id);

        let added_price = item.price * Decimal::from(quantity);

        if let Some(pos) = self
            .lines
            .iter()
            .position(|line| line.menu_item_id == item.id && line.notes == notes)
        {
            let line = &mut self.lines[pos];
            line.quantity += quantity;
            line.price += added_price;
            return Ok(&self.lines[pos]);
        }

        self.lines.push(LineItem {
            menu_item_id: item.id,
            quantity,
            price: added_price,
            notes,
        });
        let pos = self.lines.len() - 1;
        Ok(&self.lines[pos])
    }

    /// Step a line's quantity. Decrement floors at 1 (removal is only via
    /// `remove_item`). Price is recomputed from the catalog unit price, so
    /// any per-line surcharge would not survive this call.
    pub fn change_quantity(
        &mut self,
        catalog: &CatalogCache,
        line_index: usize,
        direction: QuantityDirection,
    ) -> Result<&LineItem, CartError> {
        let line = self
            .lines
            .get_mut(line_index)
            .ok_or(CartError::LineOutOfRange(line_index))?;

        let unit_price = catalog
            .find_menu_item(&line.menu_item_id)
            .map(|item| item.price)
            .ok_or_else(|| CartError::MenuItemNotFound(line.menu_item_id.clone()))?;

        match direction {
            QuantityDirection::Increment => line.quantity += 1,
            QuantityDirection::Decrement => {
                if line.quantity > 1 {
                    line.quantity -= 1;
                }
            }
        }

        line.price = unit_price * Decimal::from(line.quantity);
        Ok(&*line)
    }

    /// Remove the line at `line_index`, guarding against a stale view by
    /// requiring the menu item id to match.
    pub fn remove_item(
        &mut self,
        line_index: usize,
        menu_item_id: &str,
    ) -> Result<LineItem, CartError> {
        match self.lines.get(line_index) {
            None => Err(CartError::LineOutOfRange(line_index)),
            Some(line) if line.menu_item_id != menu_item_id => Err(CartError::LineMismatch {
                index: line_index,
                menu_item_id: menu_item_id.to_string(),
            }),
            Some(_) => Ok(self.lines.remove(line_index)),
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Walk the item's ingredients in recipe order and emit one line per
/// non-Normal level, newline-joined. An ingredient id the inventory no
/// longer resolves is logged and skipped.
fn build_notes(
    catalog: &CatalogCache,
    selection: &CustomizationStore,
    item: &MenuItem,
) -> String {
    let mut lines: Vec<String> = Vec::new();

    for &ingredient_id in &item.ingredient_ids {
        let Some(ingredient) = catalog.find_inventory_item(ingredient_id) else {
            warn!(
                "Ingredient id {} on menu item '{}' not found in inventory",
                ingredient_id, item.id
            );
            continue;
        };

        let level = selection.level(&item.id, ingredient_id);
        if let Some(line) = level.notes_line(&ingredient.name) {
            lines.push(line);
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogCache, InventoryItem, MenuItem};
    use crate::orders::customization::CustomizationLevel;
    use rust_decimal::Decimal;

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn catalog() -> CatalogCache {
        let cache = CatalogCache::new();
        cache.install(
            vec![
                MenuItem {
                    id: "M1".to_string(),
                    name: "Classic Milk Tea".to_string(),
                    price: dec(350),
                    ingredient_ids: vec![3, 7],
                },
                MenuItem {
                    id: "M2".to_string(),
                    name: "Taro Latte".to_string(),
                    price: dec(425),
                    ingredient_ids: vec![3, 99],
                },
            ],
            vec![
                InventoryItem {
                    id: 3,
                    name: "Pearls".to_string(),
                    quantity: 100,
                    price: dec(25),
                },
                InventoryItem {
                    id: 7,
                    name: "Ice".to_string(),
                    quantity: 500,
                    price: dec(5),
                },
            ],
        );
        cache
    }

    #[test]
    fn test_plain_additions_merge_into_one_line() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();

        cart.add_item(&cache, &mut selection, "M1", 1).unwrap();
        cart.add_item(&cache, &mut selection, "M1", 2).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.lines()[0].price, dec(1050));
        assert_eq!(cart.total(), dec(1050));
    }

    #[test]
    fn test_unknown_item_is_rejected_without_state_change() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();

        let err = cart.add_item(&cache, &mut selection, "NOPE", 1).unwrap_err();
        assert_eq!(err, CartError::MenuItemNotFound("NOPE".to_string()));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();

        assert_eq!(
            cart.add_item(&cache, &mut selection, "M1", 0).unwrap_err(),
            CartError::InvalidQuantity
        );
    }

    #[test]
    fn test_notes_built_in_recipe_order() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        selection.set_level("M1", 7, CustomizationLevel::Light);
        selection.set_level("M1", 3, CustomizationLevel::Extra);
        let mut cart = CartBuilder::new();

        let line = cart.add_item(&cache, &mut selection, "M1", 1).unwrap();
        assert_eq!(line.notes, "Extra Pearls\nLight Ice");
    }

    #[test]
    fn test_none_level_renders_as_no() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        selection.set_level("M1", 3, CustomizationLevel::None);
        let mut cart = CartBuilder::new();

        let line = cart.add_item(&cache, &mut selection, "M1", 1).unwrap();
        assert_eq!(line.notes, "No Pearls");
    }

    #[test]
    fn test_unresolved_ingredient_is_skipped_in_notes() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        // Ingredient 99 is on the recipe but missing from inventory.
        selection.set_level("M2", 3, CustomizationLevel::Extra);
        selection.set_level("M2", 99, CustomizationLevel::Extra);
        let mut cart = CartBuilder::new();

        let line = cart.add_item(&cache, &mut selection, "M2", 1).unwrap();
        assert_eq!(line.notes, "Extra Pearls");
    }

    #[test]
    fn test_selection_is_consumed_by_add() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        selection.set_level("M1", 3, CustomizationLevel::Extra);
        let mut cart = CartBuilder::new();

        cart.add_item(&cache, &mut selection, "M1", 1).unwrap();
        assert!(selection.is_all_normal());

        // The next plain add must not inherit the old customization.
        let line = cart.add_item(&cache, &mut selection, "M1", 1).unwrap();
        assert_eq!(line.notes, "");
    }

    #[test]
    fn test_identically_customized_additions_merge() {
        let cache = catalog();
        let mut cart = CartBuilder::new();

        for _ in 0..2 {
            let mut selection = CustomizationStore::new();
            selection.set_level("M2", 3, CustomizationLevel::Extra);
            cart.add_item(&cache, &mut selection, "M2", 1).unwrap();
        }

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.lines()[0].price, dec(850));
    }

    #[test]
    fn test_customized_and_plain_stay_separate() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();

        cart.add_item(&cache, &mut selection, "M1", 1).unwrap();
        selection.set_level("M1", 3, CustomizationLevel::Extra);
        cart.add_item(&cache, &mut selection, "M1", 1).unwrap();

        assert_eq!(cart.lines().len(), 2);
    }

    #[test]
    fn test_increment_recomputes_price_from_unit_price() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();

        cart.add_item(&cache, &mut selection, "M1", 2).unwrap();
        assert_eq!(cart.lines()[0].price, dec(700));

        let line = cart
            .change_quantity(&cache, 0, QuantityDirection::Increment)
            .unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.price, dec(1050));
    }

    #[test]
    fn test_decrement_floors_at_one() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();

        cart.add_item(&cache, &mut selection, "M1", 1).unwrap();
        let line = cart
            .change_quantity(&cache, 0, QuantityDirection::Decrement)
            .unwrap();
        assert_eq!(line.quantity, 1);
        assert_eq!(line.price, dec(350));
    }

    #[test]
    fn test_change_quantity_out_of_range() {
        let cache = catalog();
        let mut cart = CartBuilder::new();
        assert_eq!(
            cart.change_quantity(&cache, 0, QuantityDirection::Increment)
                .unwrap_err(),
            CartError::LineOutOfRange(0)
        );
    }

    #[test]
    fn test_remove_item_requires_matching_id() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();

        cart.add_item(&cache, &mut selection, "M1", 1).unwrap();

        assert_eq!(
            cart.remove_item(0, "M2").unwrap_err(),
            CartError::LineMismatch {
                index: 0,
                menu_item_id: "M2".to_string()
            }
        );

        let removed = cart.remove_item(0, "M1").unwrap();
        assert_eq!(removed.menu_item_id, "M1");
        assert!(cart.is_empty());
    }

    #[test]
    fn test_total_is_stable_without_mutation() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();

        cart.add_item(&cache, &mut selection, "M1", 2).unwrap();
        cart.add_item(&cache, &mut selection, "M2", 1).unwrap();

        let first = cart.total();
        assert_eq!(first, cart.total());
        assert_eq!(first, dec(1125));
    }

    #[test]
    fn test_clear_empties_the_cart() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();

        cart.add_item(&cache, &mut selection, "M1", 1).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }
}
