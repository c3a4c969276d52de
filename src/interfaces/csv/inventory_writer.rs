use crate::application::catalog::InventorySnapshot;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct InventoryRow<'a> {
    kind: &'static str,
    id: String,
    name: &'a str,
    available: u32,
    /// Empty for products, which have no fixed capacity.
    capacity: Option<u32>,
    status: String,
}

/// Writes the inventory report as CSV: products first, then listings.
pub struct InventoryWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> InventoryWriter<W> {
    pub fn new(sink: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        Self { writer }
    }

    /// Writes the header and one row per product and listing, then flushes.
    pub fn write_inventory(&mut self, inventory: &InventorySnapshot) -> Result<()> {
        self.writer
            .write_record(["kind", "id", "name", "available", "capacity", "status"])?;
        for product in &inventory.products {
            self.writer.serialize(InventoryRow {
                kind: "product",
                id: product.id.to_string(),
                name: &product.name,
                available: product.stock_quantity,
                capacity: None,
                status: if product.is_available {
                    "AVAILABLE".to_string()
                } else {
                    "UNAVAILABLE".to_string()
                },
            })?;
        }
        for listing in &inventory.listings {
            self.writer.serialize(InventoryRow {
                kind: "listing",
                id: listing.id.to_string(),
                name: &listing.item_name,
                available: listing.available_quantity(),
                capacity: Some(listing.quantity),
                status: listing.status.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::UserId;
    use crate::domain::listing::{ItemListing, ListingStatus};
    use crate::domain::money::{Money, Price};
    use crate::domain::product::Product;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writer_reports_products_and_listings() {
        let mut product = Product::new("Pens", Price::new(dec!(10)).unwrap(), 4);
        product.is_available = false;
        let mut listing = ItemListing::new(
            UserId::new(),
            "Tent",
            3,
            Price::new(dec!(20)).unwrap(),
            Money::new(dec!(2)),
            Money::ZERO,
        )
        .unwrap();
        listing.status = ListingStatus::Live;
        listing.currently_rented = 1;

        let mut out = Vec::new();
        InventoryWriter::new(&mut out)
            .write_inventory(&InventorySnapshot {
                products: vec![product.clone()],
                listings: vec![listing.clone()],
            })
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "kind,id,name,available,capacity,status");
        assert_eq!(lines[1], format!("product,{},Pens,4,,UNAVAILABLE", product.id));
        assert_eq!(lines[2], format!("listing,{},Tent,2,3,LIVE", listing.id));
    }

    #[test]
    fn test_writer_empty_inventory_has_header_only() {
        let mut out = Vec::new();
        InventoryWriter::new(&mut out)
            .write_inventory(&InventorySnapshot::default())
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "kind,id,name,available,capacity,status\n"
        );
    }
}
