use crate::orders::cart::CartBuilder;
use crate::orders::encoding::{encode_ids, EncodingError};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

/// 1-based week of year: day-of-year divided by 7, rounded up. Jan 1–7 are
/// week 1, Jan 8 starts week 2.
pub fn week_of_year(date: NaiveDate) -> i32 {
    (date.ordinal() as i32 + 6) / 7
}

/// Finalized order record, created at checkout confirmation and immutable
/// afterwards. `cart` is one menu id per line item in the legacy
/// backslash-delimited format; timestamps are UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub cashier: i32,
    pub sale_week: i32,
    pub sale_date: NaiveDate,
    pub current_hour: String,
    pub payment: String,
    pub cart: String,
    pub order_total: Decimal,
}

impl Order {
    pub fn from_cart(
        cashier: i32,
        cart: &CartBuilder,
        payment: String,
        now: DateTime<Utc>,
    ) -> Result<Self, EncodingError> {
        let cart_code = encode_ids(cart.lines().iter().map(|line| line.menu_item_id.as_str()))?;
        let sale_date = now.date_naive();

        Ok(Self {
            cashier,
            sale_week: week_of_year(sale_date),
            sale_date,
            current_hour: now.format("%H00").to_string(),
            payment,
            cart: cart_code,
            order_total: cart.total(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogCache, InventoryItem, MenuItem};
    use crate::orders::customization::CustomizationStore;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn catalog() -> CatalogCache {
        let cache = CatalogCache::new();
        cache.install(
            vec![
                MenuItem {
                    id: "M1".to_string(),
                    name: "Classic Milk Tea".to_string(),
                    price: Decimal::new(350, 2),
                    ingredient_ids: vec![],
                },
                MenuItem {
                    id: "M2".to_string(),
                    name: "Taro Latte".to_string(),
                    price: Decimal::new(425, 2),
                    ingredient_ids: vec![],
                },
            ],
            vec![InventoryItem {
                id: 3,
                name: "Pearls".to_string(),
                quantity: 100,
                price: Decimal::new(25, 2),
            }],
        );
        cache
    }

    #[test]
    fn test_week_of_year() {
        let d = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(week_of_year(d(2024, 1, 1)), 1);
        assert_eq!(week_of_year(d(2024, 1, 7)), 1);
        assert_eq!(week_of_year(d(2024, 1, 8)), 2);
        assert_eq!(week_of_year(d(2024, 12, 31)), 53);
        assert_eq!(week_of_year(d(2023, 12, 31)), 53);
    }

    #[test]
    fn test_order_snapshot_fields() {
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();
        cart.add_item(&cache, &mut selection, "M1", 2).unwrap();
        cart.add_item(&cache, &mut selection, "M2", 1).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 15, 14, 42, 7).unwrap();
        let order = Order::from_cart(1, &cart, "Cash".to_string(), now).unwrap();

        assert_eq!(order.cashier, 1);
        assert_eq!(order.sale_week, 11);
        assert_eq!(
            order.sale_date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(order.current_hour, "1400");
        assert_eq!(order.payment, "Cash");
        assert_eq!(order.cart, "M1\\M2");
        assert_eq!(order.order_total, Decimal::new(1125, 2));
    }

    #[test]
    fn test_cart_field_is_one_id_per_line_item() {
        // Quantity is not expanded into repeated ids; the wire format keeps
        // one id per line.
        let cache = catalog();
        let mut selection = CustomizationStore::new();
        let mut cart = CartBuilder::new();
        cart.add_item(&cache, &mut selection, "M1", 3).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let order = Order::from_cart(1, &cart, "Cash".to_string(), now).unwrap();
        assert_eq!(order.cart, "M1");
    }
}
