//! Product catalog.

use serde::{Deserialize, Serialize};

use crate::order::{Money, OrderError, OrderItem, ProductId};

/// A product that can be ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
    pub image_url: String,
}

impl Product {
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        stock: u32,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
            image_url: image_url.into(),
        }
    }

    /// Takes `quantity` units out of stock.
    ///
    /// Fails without touching the stock when fewer units are available.
    pub fn reserve(&mut self, quantity: u32) -> Result<(), OrderError> {
        if self.stock < quantity {
            return Err(self.not_enough_stock(quantity));
        }
        self.stock -= quantity;
        Ok(())
    }

    /// Snapshots this product into an order line at its current price.
    pub fn to_order_item(&self, quantity: u32) -> OrderItem {
        OrderItem::new(
            self.id.clone(),
            self.name.clone(),
            self.image_url.clone(),
            quantity,
            self.price,
        )
    }

    pub(crate) fn not_enough_stock(&self, requested: u32) -> OrderError {
        OrderError::NotEnoughStock {
            product_id: self.id.clone(),
            product_name: self.name.clone(),
            stock: self.stock,
            requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(stock: u32) -> Product {
        Product::new("SKU-001", "Widget", Money::from_cents(1000), stock, "/img/widget.png")
    }

    #[test]
    fn reserve_decrements_stock() {
        let mut product = widget(5);
        product.reserve(5).unwrap();
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn reserve_more_than_stock_fails_and_keeps_stock() {
        let mut product = widget(5);

        let err = product.reserve(6).unwrap_err();

        match err {
            OrderError::NotEnoughStock {
                product_id,
                product_name,
                stock,
                requested,
            } => {
                assert_eq!(product_id, ProductId::new("SKU-001"));
                assert_eq!(product_name, "Widget");
                assert_eq!(stock, 5);
                assert_eq!(requested, 6);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(product.stock, 5);
    }

    #[test]
    fn order_item_snapshots_current_price() {
        let mut product = widget(3);
        let item = product.to_order_item(2);
        product.price = Money::from_cents(9999);

        assert_eq!(item.unit_price, Money::from_cents(1000));
        assert_eq!(item.image_url, "/img/widget.png");
        assert_eq!(item.quantity, 2);
    }
}
