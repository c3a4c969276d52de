use crate::domain::ids::{ListingId, ProductId};
use crate::domain::listing::ItemListing;
use crate::domain::ports::UnitOfWork;
use crate::domain::product::Product;
use crate::error::{MarketError, Result};
use tracing::debug;

/// Moves product stock and listing capacity.
///
/// Every call reads and writes through the caller's unit of work, which the
/// store serializes, so concurrent reservations against one counter cannot
/// lose updates. Nothing is persisted until the unit commits.
pub struct StockLedger;

impl StockLedger {
    pub async fn reserve(
        uow: &mut dyn UnitOfWork,
        product_id: ProductId,
        qty: u32,
    ) -> Result<Product> {
        let mut product = uow
            .product(product_id)
            .await?
            .ok_or_else(|| MarketError::not_found("product", product_id))?;
        product.reserve(qty)?;
        debug!(%product_id, qty, remaining = product.stock_quantity, "stock reserved");
        uow.put_product(product.clone()).await?;
        Ok(product)
    }

    pub async fn release(
        uow: &mut dyn UnitOfWork,
        product_id: ProductId,
        qty: u32,
    ) -> Result<Product> {
        let mut product = uow
            .product(product_id)
            .await?
            .ok_or_else(|| MarketError::not_found("product", product_id))?;
        product.release(qty);
        debug!(%product_id, qty, remaining = product.stock_quantity, "stock released");
        uow.put_product(product.clone()).await?;
        Ok(product)
    }

    pub async fn reserve_unit(
        uow: &mut dyn UnitOfWork,
        listing_id: ListingId,
    ) -> Result<ItemListing> {
        let mut listing = uow
            .listing(listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found("listing", listing_id))?;
        listing.reserve_unit()?;
        debug!(%listing_id, rented = listing.currently_rented, "rental unit reserved");
        uow.put_listing(listing.clone()).await?;
        Ok(listing)
    }

    pub async fn release_unit(
        uow: &mut dyn UnitOfWork,
        listing_id: ListingId,
    ) -> Result<ItemListing> {
        let mut listing = uow
            .listing(listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found("listing", listing_id))?;
        listing.release_unit();
        debug!(%listing_id, rented = listing.currently_rented, "rental unit released");
        uow.put_listing(listing.clone()).await?;
        Ok(listing)
    }
}
