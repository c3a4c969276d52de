use super::ids::{ListingId, UserId};
use super::money::{Money, Price};
use crate::error::MarketError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    PendingReview,
    Live,
    Rejected,
    Archived,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PendingReview => "PENDING_REVIEW",
            Self::Live => "LIVE",
            Self::Rejected => "REJECTED",
            Self::Archived => "ARCHIVED",
        };
        f.write_str(label)
    }
}

/// A seller's offer of an item for rent.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ItemListing {
    pub id: ListingId,
    pub seller_id: UserId,
    pub item_name: String,
    /// Total units the seller owns.
    pub quantity: u32,
    /// Units presently out with renters.
    pub currently_rented: u32,
    pub status: ListingStatus,
    pub rent_per_day: Price,
    pub platform_fee: Money,
    pub security_deposit: Money,
}

impl ItemListing {
    pub fn new(
        seller_id: UserId,
        item_name: impl Into<String>,
        quantity: u32,
        rent_per_day: Price,
        platform_fee: Money,
        security_deposit: Money,
    ) -> Result<Self, MarketError> {
        let item_name = item_name.into();
        if item_name.trim().is_empty() {
            return Err(MarketError::InvalidInput(
                "Listing needs an item name".to_string(),
            ));
        }
        if quantity == 0 {
            return Err(MarketError::InvalidInput(
                "Listing quantity must be at least 1".to_string(),
            ));
        }
        if platform_fee.is_negative() || security_deposit.is_negative() {
            return Err(MarketError::InvalidInput(
                "Fees and deposits cannot be negative".to_string(),
            ));
        }
        Ok(Self {
            id: ListingId::new(),
            seller_id,
            item_name,
            quantity,
            currently_rented: 0,
            status: ListingStatus::PendingReview,
            rent_per_day,
            platform_fee,
            security_deposit,
        })
    }

    /// Renter-facing daily price.
    pub fn final_rent(&self) -> Result<Money, MarketError> {
        self.rent_per_day.as_money().checked_add(self.platform_fee)
    }

    pub fn available_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.currently_rented)
    }

    pub fn is_live(&self) -> bool {
        self.status == ListingStatus::Live
    }

    pub fn reserve_unit(&mut self) -> Result<(), MarketError> {
        if self.available_quantity() == 0 {
            return Err(MarketError::Unavailable(format!(
                "No units of '{}' are free to rent",
                self.item_name
            )));
        }
        self.currently_rented += 1;
        Ok(())
    }

    pub fn release_unit(&mut self) {
        self.currently_rented = self.currently_rented.saturating_sub(1);
    }
}
