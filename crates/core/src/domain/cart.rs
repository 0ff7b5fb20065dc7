use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::OrderLine;
use crate::domain::product::Product;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn single(product: Product) -> Self {
        Self { product, quantity: 1 }
    }

    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }

    pub fn as_order_line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product.id.clone(),
            short_id: self.product.short_id,
            name: self.product.name.clone(),
            unit_price: self.product.price,
            quantity: self.quantity,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CartSummary {
    pub item_count: usize,
    pub total: Decimal,
}

impl CartSummary {
    pub fn of(items: &[CartItem]) -> Self {
        Self {
            item_count: items.iter().map(|item| item.quantity as usize).sum(),
            total: items.iter().map(CartItem::line_total).sum(),
        }
    }
}

/// Session-owned cart. Every add appends a new line of quantity one, so adding
/// the same product twice yields two lines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, product: Product) {
        self.items.push(CartItem::single(product));
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.summary().total
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary::of(&self.items)
    }

    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.items.iter().map(CartItem::as_order_line).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::Cart;
    use crate::domain::product::{Category, Product, ProductId};

    fn product(id: &str, price: i64) -> Product {
        Product {
            id: ProductId(id.to_owned()),
            short_id: 1,
            name: id.to_owned(),
            category: Some(Category::Breakfast),
            price: Decimal::new(price, 0),
        }
    }

    #[test]
    fn repeated_adds_keep_duplicate_lines() {
        let mut cart = Cart::new();
        cart.add(product("idli", 50));
        cart.add(product("idli", 50));
        cart.add(product("poha", 40));

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.total(), Decimal::new(140, 0));
        assert!(cart.items().iter().all(|item| item.quantity == 1));
    }

    #[test]
    fn clear_empties_the_cart() {
        let mut cart = Cart::new();
        cart.add(product("idli", 50));
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.summary().total, Decimal::ZERO);
    }
}
