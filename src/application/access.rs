use crate::domain::message::SenderRole;
use crate::domain::order::Order;
use crate::domain::ports::UnitOfWork;
use crate::domain::rental::RentalTransaction;
use crate::domain::user::{Caller, Role, UserProfile};
use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};

/// Which side of a rental a caller acts on.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum RentalSide {
    Renter,
    Seller,
}

/// Role and ownership checks run inside every engine operation, whatever the
/// outer layer already checked.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Resolves the caller to its registered profile. A caller claiming ADMIN
    /// must be registered as one.
    pub async fn authenticate(uow: &mut dyn UnitOfWork, caller: &Caller) -> Result<UserProfile> {
        let profile = uow.user(caller.user_id).await?.ok_or_else(|| {
            MarketError::Unauthorized(format!("Unknown caller {}", caller.user_id))
        })?;
        if caller.role == Role::Admin && profile.role != Role::Admin {
            return Err(MarketError::Forbidden(format!(
                "User {} does not hold the ADMIN role",
                caller.user_id
            )));
        }
        Ok(profile)
    }

    pub fn require_admin(caller: &Caller) -> Result<()> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(MarketError::Forbidden(
                "Only administrators may do this".to_string(),
            ))
        }
    }

    /// Owner or any admin.
    pub fn order_access(caller: &Caller, order: &Order) -> Result<SenderRole> {
        if caller.is_admin() {
            Ok(SenderRole::Admin)
        } else if order.user_id == caller.user_id {
            Ok(SenderRole::Customer)
        } else {
            Err(MarketError::Forbidden(format!(
                "Order {} belongs to another customer",
                order.id
            )))
        }
    }

    /// The side of the rental the caller is on, if any.
    pub fn rental_party(caller: &Caller, rental: &RentalTransaction) -> Option<RentalSide> {
        if rental.renter_id == caller.user_id {
            Some(RentalSide::Renter)
        } else if rental.seller_id == caller.user_id {
            Some(RentalSide::Seller)
        } else {
            None
        }
    }

    /// Renter, seller, or an admin.
    pub fn rental_access(caller: &Caller, rental: &RentalTransaction) -> Result<()> {
        if caller.is_admin() || Self::rental_party(caller, rental).is_some() {
            Ok(())
        } else {
            Err(MarketError::Forbidden(format!(
                "Rental {} is not yours",
                rental.id
            )))
        }
    }

    /// Seller or an admin.
    pub fn rental_seller_access(caller: &Caller, rental: &RentalTransaction) -> Result<()> {
        if caller.is_admin() || rental.seller_id == caller.user_id {
            Ok(())
        } else {
            Err(MarketError::Forbidden(format!(
                "Only the seller or an administrator may manage rental {}",
                rental.id
            )))
        }
    }

    /// Rental threads are private to renter and seller.
    pub fn rental_thread_access(caller: &Caller, rental: &RentalTransaction) -> Result<SenderRole> {
        match Self::rental_party(caller, rental) {
            Some(RentalSide::Renter) => Ok(SenderRole::Renter),
            Some(RentalSide::Seller) => Ok(SenderRole::Seller),
            None => Err(MarketError::Forbidden(format!(
                "Only the renter and seller may use the thread of rental {}",
                rental.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::UserId;
    use crate::domain::money::Money;
    use crate::domain::order::PaymentMethod;
    use crate::domain::ports::MarketStore;
    use crate::infrastructure::in_memory::InMemoryMarketStore;
    use chrono::Utc;

    #[tokio::test]
    async fn test_unknown_caller_is_unauthorized() {
        let store = InMemoryMarketStore::new();
        let mut uow = store.begin().await.unwrap();
        let err = AccessPolicy::authenticate(uow.as_mut(), &Caller::customer(UserId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_claimed_admin_role_must_match_profile() {
        let store = InMemoryMarketStore::new();
        let mut uow = store.begin().await.unwrap();
        let student = UserProfile::new("Ana", "ana@campus.edu", Role::Customer);
        uow.put_user(student.clone()).await.unwrap();

        let err = AccessPolicy::authenticate(uow.as_mut(), &Caller::admin(student.id))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));

        let profile = AccessPolicy::authenticate(uow.as_mut(), &Caller::customer(student.id))
            .await
            .unwrap();
        assert_eq!(profile, student);
    }

    #[test]
    fn test_order_access() {
        let owner = UserId::new();
        let order = crate::domain::order::Order::new(
            owner,
            PaymentMethod::Cod,
            Money::ZERO,
            None,
            Utc::now(),
        );
        assert_eq!(
            AccessPolicy::order_access(&Caller::customer(owner), &order).unwrap(),
            SenderRole::Customer
        );
        assert_eq!(
            AccessPolicy::order_access(&Caller::admin(UserId::new()), &order).unwrap(),
            SenderRole::Admin
        );
        assert!(AccessPolicy::order_access(&Caller::customer(UserId::new()), &order).is_err());
    }
}
