use super::access::{AccessPolicy, RentalSide};
use super::engine::Marketplace;
use super::stock::StockLedger;
use crate::domain::ids::{ListingId, RentalId};
use crate::domain::money::Money;
use crate::domain::order::PaymentMethod;
use crate::domain::ports::UnitOfWork;
use crate::domain::rental::{CheckoutTerms, CostBreakdown, RentalTransaction};
use crate::domain::user::Caller;
use crate::error::{MarketError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CheckoutRequest {
    /// Client-chosen id for the new rental; generated when absent.
    #[serde(default)]
    pub rental_id: Option<RentalId>,
    pub listing_id: ListingId,
    pub rental_days: u32,
    pub payment_pin: String,
    pub payment_method: PaymentMethod,
    /// Defaults to the moment of checkout.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub rental: RentalTransaction,
    pub breakdown: CostBreakdown,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PayoutReceipt {
    pub rental_id: RentalId,
    pub amount: Money,
    pub total_paid_out: Money,
}

impl Marketplace {
    /// Rents one unit of a live listing to the caller.
    ///
    /// The rental starts PENDING with `days_rented` at zero; days accrue only
    /// once payment is confirmed and the rental is ACTIVE.
    pub async fn checkout_rental(
        &self,
        caller: &Caller,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt> {
        if request.rental_days == 0 {
            return Err(MarketError::InvalidInput(
                "Rental must last at least one day".to_string(),
            ));
        }
        let payment_pin = request.payment_pin.trim().to_string();
        if payment_pin.is_empty() {
            return Err(MarketError::InvalidInput(
                "Payment PIN is required".to_string(),
            ));
        }

        let mut uow = self.begin().await?;
        let now = self.now();
        let renter = AccessPolicy::authenticate(uow.as_mut(), caller).await?;

        let listing = uow
            .listing(request.listing_id)
            .await?
            .ok_or_else(|| MarketError::not_found("listing", request.listing_id))?;
        if !listing.is_live() {
            return Err(MarketError::Unavailable(format!(
                "Listing {} is not live",
                listing.id
            )));
        }
        if listing.seller_id == caller.user_id {
            return Err(MarketError::Forbidden(
                "Sellers cannot rent their own listings".to_string(),
            ));
        }
        let seller = uow
            .user(listing.seller_id)
            .await?
            .ok_or_else(|| MarketError::not_found("user", listing.seller_id))?;

        if let Some(rental_id) = request.rental_id
            && uow.rental(rental_id).await?.is_some()
        {
            return Err(MarketError::Conflict(format!(
                "Rental {rental_id} already exists"
            )));
        }

        let listing = StockLedger::reserve_unit(uow.as_mut(), listing.id).await?;
        let mut rental = RentalTransaction::open(
            &listing,
            &renter,
            &seller,
            CheckoutTerms {
                rental_days: request.rental_days,
                payment_pin,
                payment_method: request.payment_method,
                start_date: request.start_date.unwrap_or(now),
            },
            now,
        )?;
        if let Some(rental_id) = request.rental_id {
            rental.id = rental_id;
        }
        let breakdown = rental.breakdown()?;
        uow.put_rental(rental.clone()).await?;
        uow.commit().await?;

        info!(
            rental_id = %rental.id,
            listing_id = %listing.id,
            renter_id = %rental.renter_id,
            total = %rental.total_amount,
            "rental checked out"
        );
        Ok(CheckoutReceipt { rental, breakdown })
    }

    /// Confirms payment and starts the rental. Seller or admin only.
    pub async fn activate_rental(
        &self,
        caller: &Caller,
        rental_id: RentalId,
    ) -> Result<RentalTransaction> {
        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        let mut rental = load_rental(uow.as_mut(), rental_id).await?;
        AccessPolicy::rental_seller_access(caller, &rental)?;

        rental.activate(now)?;
        uow.put_rental(rental.clone()).await?;
        uow.commit().await?;

        info!(%rental_id, days_rented = rental.days_rented, "rental activated");
        Ok(rental)
    }

    /// Brings `days_rented` and the seller's accrued earnings up to date.
    pub async fn accrue_rental(
        &self,
        caller: &Caller,
        rental_id: RentalId,
    ) -> Result<RentalTransaction> {
        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        let mut rental = load_rental(uow.as_mut(), rental_id).await?;
        AccessPolicy::rental_access(caller, &rental)?;

        if accrue_in(uow.as_mut(), &mut rental, now).await? {
            uow.commit().await?;
        }
        Ok(rental)
    }

    /// The caller's rentals on one side, newest first. Active rentals are
    /// accrued before they are returned.
    pub async fn rentals(
        &self,
        caller: &Caller,
        side: RentalSide,
    ) -> Result<Vec<RentalTransaction>> {
        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;

        let mut rentals: Vec<RentalTransaction> = uow
            .all_rentals()
            .await?
            .into_iter()
            .filter(|rental| AccessPolicy::rental_party(caller, rental) == Some(side))
            .collect();

        let mut changed = false;
        for rental in rentals.iter_mut() {
            changed |= accrue_in(uow.as_mut(), rental, now).await?;
        }
        if changed {
            uow.commit().await?;
        }

        rentals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rentals)
    }

    pub async fn rental(&self, caller: &Caller, rental_id: RentalId) -> Result<RentalTransaction> {
        self.accrue_rental(caller, rental_id).await
    }

    /// Ends an active rental after a final accrual and frees its unit.
    pub async fn complete_rental(
        &self,
        caller: &Caller,
        rental_id: RentalId,
    ) -> Result<RentalTransaction> {
        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        let mut rental = load_rental(uow.as_mut(), rental_id).await?;
        AccessPolicy::rental_seller_access(caller, &rental)?;

        rental.complete(now)?;
        StockLedger::release_unit(uow.as_mut(), rental.listing_id).await?;
        uow.put_rental(rental.clone()).await?;
        uow.commit().await?;

        info!(
            %rental_id,
            days_rented = rental.days_rented,
            owed = %rental.amount_owed_to_seller,
            "rental completed"
        );
        Ok(rental)
    }

    /// Cancels a rental that never started and frees its unit.
    pub async fn cancel_rental(
        &self,
        caller: &Caller,
        rental_id: RentalId,
    ) -> Result<RentalTransaction> {
        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        let mut rental = load_rental(uow.as_mut(), rental_id).await?;
        AccessPolicy::rental_access(caller, &rental)?;

        rental.cancel(now)?;
        StockLedger::release_unit(uow.as_mut(), rental.listing_id).await?;
        uow.put_rental(rental.clone()).await?;
        uow.commit().await?;

        info!(%rental_id, "rental cancelled");
        Ok(rental)
    }

    /// Pays the seller everything accrued and not yet paid. Admin only.
    pub async fn record_payout(
        &self,
        caller: &Caller,
        rental_id: RentalId,
    ) -> Result<PayoutReceipt> {
        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        AccessPolicy::require_admin(caller)?;
        let mut rental = load_rental(uow.as_mut(), rental_id).await?;

        rental.accrue(now)?;
        let amount = rental.record_payout()?;
        uow.put_rental(rental.clone()).await?;
        uow.commit().await?;

        info!(%rental_id, amount = %amount, seller_id = %rental.seller_id, "seller payout recorded");
        Ok(PayoutReceipt {
            rental_id,
            amount,
            total_paid_out: rental.seller_paid_out,
        })
    }
}

async fn load_rental(uow: &mut dyn UnitOfWork, rental_id: RentalId) -> Result<RentalTransaction> {
    uow.rental(rental_id)
        .await?
        .ok_or_else(|| MarketError::not_found("rental", rental_id))
}

/// Accrues `rental` and stages the write. Returns whether anything changed.
async fn accrue_in(
    uow: &mut dyn UnitOfWork,
    rental: &mut RentalTransaction,
    now: DateTime<Utc>,
) -> Result<bool> {
    if !rental.accrue(now)? {
        debug!(rental_id = %rental.id, status = %rental.status, "accrual unchanged");
        return Ok(false);
    }
    uow.put_rental(rental.clone()).await?;
    info!(
        rental_id = %rental.id,
        days_rented = rental.days_rented,
        owed = %rental.amount_owed_to_seller,
        "rental accrued"
    );
    Ok(true)
}
