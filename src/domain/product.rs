use super::ids::{CategoryId, ProductId};
use super::money::Price;
use crate::error::MarketError;
use serde::{Deserialize, Serialize};

/// A retail item sold from stock.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock_quantity: u32,
    pub is_available: bool,
    pub category_id: CategoryId,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Price, stock_quantity: u32) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            price,
            stock_quantity,
            is_available: true,
            category_id: CategoryId::new(),
        }
    }

    /// Takes `qty` units out of stock.
    ///
    /// Leaves the product untouched on failure.
    pub fn reserve(&mut self, qty: u32) -> Result<(), MarketError> {
        if qty == 0 {
            return Err(MarketError::InvalidInput(format!(
                "Quantity for '{}' must be at least 1",
                self.name
            )));
        }
        if !self.is_available {
            return Err(MarketError::ProductUnavailable {
                product_id: self.id.to_string(),
                name: self.name.clone(),
            });
        }
        if self.stock_quantity < qty {
            return Err(MarketError::InsufficientStock {
                name: self.name.clone(),
                requested: qty,
                available: self.stock_quantity,
            });
        }
        self.stock_quantity -= qty;
        Ok(())
    }

    /// Returns `qty` units to stock. There is no upper bound.
    pub fn release(&mut self, qty: u32) {
        self.stock_quantity = self.stock_quantity.saturating_add(qty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pen(stock: u32) -> Product {
        Product::new("Gel Pen", Price::new(dec!(15)).unwrap(), stock)
    }

    #[test]
    fn test_reserve_decrements_stock() {
        let mut product = pen(5);
        product.reserve(5).unwrap();
        assert_eq!(product.stock_quantity, 0);
    }

    #[test]
    fn test_reserve_beyond_stock_leaves_stock_unchanged() {
        let mut product = pen(2);
        let err = product.reserve(3).unwrap_err();
        assert!(matches!(
            err,
            MarketError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert_eq!(product.stock_quantity, 2);
    }

    #[test]
    fn test_unavailable_product_blocks_reserve() {
        let mut product = pen(10);
        product.is_available = false;
        assert!(matches!(
            product.reserve(1),
            Err(MarketError::ProductUnavailable { .. })
        ));
        assert_eq!(product.stock_quantity, 10);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut product = pen(10);
        assert!(matches!(
            product.reserve(0),
            Err(MarketError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_release_restores_stock() {
        let mut product = pen(1);
        product.release(4);
        assert_eq!(product.stock_quantity, 5);
    }
}
