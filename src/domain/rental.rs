use super::ids::{ListingId, RentalId, UserId};
use super::listing::ItemListing;
use super::money::Money;
use super::order::{PaymentMethod, PaymentStatus};
use super::user::{ContactSnapshot, UserProfile};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

/// What the renter is charged at checkout.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CostBreakdown {
    pub rent_per_day: Money,
    pub platform_fee: Money,
    pub daily_rate: Money,
    pub rental_days: u32,
    pub total_rent: Money,
    pub security_deposit: Money,
    pub total_amount: Money,
}

/// A peer-to-peer rental of one unit of a listing.
///
/// Financial and contact fields are copied from the listing and the two
/// profiles at checkout and never re-read from them.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RentalTransaction {
    pub id: RentalId,
    pub listing_id: ListingId,
    pub item_name: String,
    pub renter_id: UserId,
    pub seller_id: UserId,
    pub renter_contact: ContactSnapshot,
    pub seller_contact: ContactSnapshot,
    pub rent_per_day: Money,
    pub platform_fee: Money,
    /// Seller's share of each accrued day.
    pub seller_earning: Money,
    pub security_deposit: Money,
    pub daily_rate: Money,
    /// Days requested at checkout.
    pub rental_days: u32,
    pub total_amount: Money,
    pub start_date: DateTime<Utc>,
    /// Whole days elapsed since `start_date`, as of `last_calculated`.
    pub days_rented: u32,
    pub total_paid: Money,
    pub amount_owed_to_seller: Money,
    /// Cumulative amount already paid out to the seller.
    pub seller_paid_out: Money,
    pub status: RentalStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_pin: String,
    pub last_calculated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

pub struct CheckoutTerms {
    pub rental_days: u32,
    pub payment_pin: String,
    pub payment_method: PaymentMethod,
    pub start_date: DateTime<Utc>,
}

impl RentalTransaction {
    pub fn open(
        listing: &ItemListing,
        renter: &UserProfile,
        seller: &UserProfile,
        terms: CheckoutTerms,
        now: DateTime<Utc>,
    ) -> Result<Self, MarketError> {
        let daily_rate = listing.final_rent()?;
        let total_amount = daily_rate
            .checked_mul(terms.rental_days)?
            .checked_add(listing.security_deposit)?;
        Ok(Self {
            id: RentalId::new(),
            listing_id: listing.id,
            item_name: listing.item_name.clone(),
            renter_id: renter.id,
            seller_id: seller.id,
            renter_contact: renter.contact(),
            seller_contact: seller.contact(),
            rent_per_day: listing.rent_per_day.as_money(),
            platform_fee: listing.platform_fee,
            seller_earning: listing.rent_per_day.as_money(),
            security_deposit: listing.security_deposit,
            daily_rate,
            rental_days: terms.rental_days,
            total_amount,
            start_date: terms.start_date,
            days_rented: 0,
            total_paid: Money::ZERO,
            amount_owed_to_seller: Money::ZERO,
            seller_paid_out: Money::ZERO,
            status: RentalStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: terms.payment_method,
            payment_pin: terms.payment_pin,
            last_calculated: None,
            created_at: now,
            ended_at: None,
        })
    }

    pub fn breakdown(&self) -> Result<CostBreakdown, MarketError> {
        Ok(CostBreakdown {
            rent_per_day: self.rent_per_day,
            platform_fee: self.platform_fee,
            daily_rate: self.daily_rate,
            rental_days: self.rental_days,
            total_rent: self.daily_rate.checked_mul(self.rental_days)?,
            security_deposit: self.security_deposit,
            total_amount: self.total_amount,
        })
    }

    pub fn is_party(&self, user: UserId) -> bool {
        self.renter_id == user || self.seller_id == user
    }

    /// Whole days between `start_date` and `now`, zero if the rental has not
    /// started yet.
    pub fn days_since_start(&self, now: DateTime<Utc>) -> u32 {
        let days = (now - self.start_date).num_days();
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }

    /// Recomputes the accrual from `start_date`. Returns whether anything
    /// changed.
    ///
    /// The result depends only on `now`, so repeated calls converge. The day
    /// count never moves backwards. On overflow the rental is left as it
    /// was.
    pub fn accrue(&mut self, now: DateTime<Utc>) -> Result<bool, MarketError> {
        if self.status != RentalStatus::Active {
            return Ok(false);
        }
        let days = self.days_since_start(now);
        if days <= self.days_rented {
            return Ok(false);
        }
        let owed = self.seller_earning.checked_mul(days)?;
        self.days_rented = days;
        self.amount_owed_to_seller = owed;
        self.last_calculated = Some(now);
        Ok(true)
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), MarketError> {
        if self.status != RentalStatus::Pending {
            return Err(MarketError::InvalidTransition(format!(
                "Rental {} is {} and cannot be activated",
                self.id, self.status
            )));
        }
        self.status = RentalStatus::Active;
        self.payment_status = PaymentStatus::Completed;
        self.total_paid = self.total_amount;
        self.last_calculated = Some(now);
        self.accrue(now)?;
        Ok(())
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), MarketError> {
        if self.status != RentalStatus::Active {
            return Err(MarketError::InvalidTransition(format!(
                "Rental {} is {} and cannot be completed",
                self.id, self.status
            )));
        }
        self.accrue(now)?;
        self.status = RentalStatus::Completed;
        self.ended_at = Some(now);
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), MarketError> {
        if self.status != RentalStatus::Pending {
            return Err(MarketError::InvalidTransition(format!(
                "Rental {} is {} and cannot be cancelled",
                self.id, self.status
            )));
        }
        self.status = RentalStatus::Cancelled;
        self.ended_at = Some(now);
        Ok(())
    }

    pub fn outstanding_payout(&self) -> Money {
        self.amount_owed_to_seller - self.seller_paid_out
    }

    /// Marks everything accrued so far as paid to the seller and returns the
    /// amount paid by this call.
    pub fn record_payout(&mut self) -> Result<Money, MarketError> {
        if !matches!(self.status, RentalStatus::Active | RentalStatus::Completed) {
            return Err(MarketError::InvalidTransition(format!(
                "Rental {} is {} and has nothing to pay out",
                self.id, self.status
            )));
        }
        let outstanding = self.outstanding_payout();
        if outstanding <= Money::ZERO {
            return Err(MarketError::Conflict(format!(
                "Rental {} has no outstanding seller earnings",
                self.id
            )));
        }
        self.seller_paid_out = self.amount_owed_to_seller;
        Ok(outstanding)
    }
}
