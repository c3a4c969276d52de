use super::access::AccessPolicy;
use super::engine::Marketplace;
use super::stock::StockLedger;
use crate::domain::ids::{ListingId, ProductId};
use crate::domain::listing::{ItemListing, ListingStatus};
use crate::domain::money::{Money, Price};
use crate::domain::product::Product;
use crate::domain::user::{Caller, ContactUpdate, UserProfile};
use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// What a seller submits to list an item for rent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListingDraft {
    /// Client-chosen id; generated when absent.
    #[serde(default)]
    pub listing_id: Option<ListingId>,
    pub item_name: String,
    pub quantity: u32,
    pub rent_per_day: Price,
    #[serde(default)]
    pub platform_fee: Money,
    #[serde(default)]
    pub security_deposit: Money,
}

/// Current stock and capacity of everything on offer.
#[derive(Debug, Serialize, Clone, Default)]
pub struct InventorySnapshot {
    pub products: Vec<Product>,
    pub listings: Vec<ItemListing>,
}

/// Registration and lookup of the records the lifecycles operate on. These
/// are plain writes; the storefront's catalog management lives elsewhere.
impl Marketplace {
    /// Records a profile handed over by the authentication layer.
    pub async fn register_user(&self, profile: UserProfile) -> Result<UserProfile> {
        let mut uow = self.begin().await?;
        if uow.user(profile.id).await?.is_some() {
            return Err(MarketError::Conflict(format!(
                "User {} is already registered",
                profile.id
            )));
        }
        uow.put_user(profile.clone()).await?;
        uow.commit().await?;
        info!(user_id = %profile.id, role = ?profile.role, "user registered");
        Ok(profile)
    }

    /// Edits the caller's own contact details. Rentals keep the contact
    /// snapshot taken at checkout.
    pub async fn update_user_contact(
        &self,
        caller: &Caller,
        update: ContactUpdate,
    ) -> Result<UserProfile> {
        let mut uow = self.begin().await?;
        let mut profile = AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        profile.apply_contact(update);
        uow.put_user(profile.clone()).await?;
        uow.commit().await?;
        Ok(profile)
    }

    pub async fn register_product(&self, caller: &Caller, product: Product) -> Result<Product> {
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        AccessPolicy::require_admin(caller)?;
        if product.name.trim().is_empty() {
            return Err(MarketError::InvalidInput(
                "Product needs a name".to_string(),
            ));
        }
        if uow.product(product.id).await?.is_some() {
            return Err(MarketError::Conflict(format!(
                "Product {} already exists",
                product.id
            )));
        }
        uow.put_product(product.clone()).await?;
        uow.commit().await?;
        info!(product_id = %product.id, stock = product.stock_quantity, "product registered");
        Ok(product)
    }

    /// Changes the catalog price. Existing orders keep their frozen prices.
    pub async fn set_product_price(
        &self,
        caller: &Caller,
        product_id: ProductId,
        price: Price,
    ) -> Result<Product> {
        self.edit_product(caller, product_id, |product| product.price = price)
            .await
    }

    pub async fn set_product_availability(
        &self,
        caller: &Caller,
        product_id: ProductId,
        is_available: bool,
    ) -> Result<Product> {
        self.edit_product(caller, product_id, |product| {
            product.is_available = is_available
        })
        .await
    }

    pub async fn restock_product(
        &self,
        caller: &Caller,
        product_id: ProductId,
        qty: u32,
    ) -> Result<Product> {
        if qty == 0 {
            return Err(MarketError::InvalidInput(
                "Restock quantity must be at least 1".to_string(),
            ));
        }
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        AccessPolicy::require_admin(caller)?;
        let product = StockLedger::release(uow.as_mut(), product_id, qty).await?;
        uow.commit().await?;
        info!(%product_id, qty, stock = product.stock_quantity, "product restocked");
        Ok(product)
    }

    async fn edit_product(
        &self,
        caller: &Caller,
        product_id: ProductId,
        edit: impl FnOnce(&mut Product) + Send,
    ) -> Result<Product> {
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        AccessPolicy::require_admin(caller)?;
        let mut product = uow
            .product(product_id)
            .await?
            .ok_or_else(|| MarketError::not_found("product", product_id))?;
        edit(&mut product);
        uow.put_product(product.clone()).await?;
        uow.commit().await?;
        Ok(product)
    }

    /// Lists an item on behalf of the caller. New listings await review.
    pub async fn register_listing(
        &self,
        caller: &Caller,
        draft: ListingDraft,
    ) -> Result<ItemListing> {
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        let mut listing = ItemListing::new(
            caller.user_id,
            draft.item_name,
            draft.quantity,
            draft.rent_per_day,
            draft.platform_fee,
            draft.security_deposit,
        )?;
        if let Some(listing_id) = draft.listing_id {
            if uow.listing(listing_id).await?.is_some() {
                return Err(MarketError::Conflict(format!(
                    "Listing {listing_id} already exists"
                )));
            }
            listing.id = listing_id;
        }
        uow.put_listing(listing.clone()).await?;
        uow.commit().await?;
        info!(listing_id = %listing.id, seller_id = %listing.seller_id, "listing submitted");
        Ok(listing)
    }

    pub async fn review_listing(
        &self,
        caller: &Caller,
        listing_id: ListingId,
        approve: bool,
    ) -> Result<ItemListing> {
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        AccessPolicy::require_admin(caller)?;
        let mut listing = uow
            .listing(listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found("listing", listing_id))?;
        if listing.status != ListingStatus::PendingReview {
            return Err(MarketError::InvalidTransition(format!(
                "Listing {listing_id} has already been reviewed"
            )));
        }
        listing.status = if approve {
            ListingStatus::Live
        } else {
            ListingStatus::Rejected
        };
        uow.put_listing(listing.clone()).await?;
        uow.commit().await?;
        info!(%listing_id, status = ?listing.status, "listing reviewed");
        Ok(listing)
    }

    pub async fn product(&self, product_id: ProductId) -> Result<Product> {
        let mut uow = self.begin().await?;
        uow.product(product_id)
            .await?
            .ok_or_else(|| MarketError::not_found("product", product_id))
    }

    pub async fn listing(&self, listing_id: ListingId) -> Result<ItemListing> {
        let mut uow = self.begin().await?;
        uow.listing(listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found("listing", listing_id))
    }

    /// Products and listings, each sorted by name.
    pub async fn inventory(&self) -> Result<InventorySnapshot> {
        let mut uow = self.begin().await?;
        let mut products = uow.all_products().await?;
        let mut listings = uow.all_listings().await?;
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        listings.sort_by(|a, b| a.item_name.cmp(&b.item_name).then(a.id.cmp(&b.id)));
        Ok(InventorySnapshot { products, listings })
    }
}
