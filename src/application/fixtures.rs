use super::catalog::ListingDraft;
use super::engine::Marketplace;
use crate::domain::listing::ItemListing;
use crate::domain::money::{Money, Price};
use crate::domain::product::Product;
use crate::domain::user::{Caller, Role, UserProfile};
use crate::infrastructure::clock::ManualClock;
use crate::infrastructure::in_memory::InMemoryMarketStore;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

pub(crate) fn term_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap()
}

/// An in-memory marketplace with one admin and one customer registered.
/// `store` shares state with `market`.
pub(crate) struct Fixture {
    pub market: Marketplace,
    pub store: InMemoryMarketStore,
    pub clock: ManualClock,
    pub admin: Caller,
    pub customer: Caller,
    pub customer_profile: UserProfile,
}

impl Fixture {
    pub async fn new() -> Self {
        let clock = ManualClock::new(term_start());
        let store = InMemoryMarketStore::new();
        let market = Marketplace::new(Box::new(store.clone()), Box::new(clock.clone()));
        let admin = UserProfile::new("Store Admin", "admin@campus.edu", Role::Admin);
        let customer_profile = UserProfile::new("Priya", "priya@campus.edu", Role::Customer)
            .with_contact("555-0100", "H-101");
        market.register_user(admin.clone()).await.unwrap();
        market
            .register_user(customer_profile.clone())
            .await
            .unwrap();
        Self {
            market,
            store,
            clock,
            admin: Caller::admin(admin.id),
            customer: Caller::customer(customer_profile.id),
            customer_profile,
        }
    }

    pub async fn register(&self, role: Role, name: &str) -> Caller {
        let email = format!("{}@campus.edu", name.to_lowercase());
        let profile = UserProfile::new(name, email, role).with_contact("555-0199", "C-12");
        self.market.register_user(profile.clone()).await.unwrap();
        Caller {
            user_id: profile.id,
            role,
        }
    }

    pub async fn product(&self, name: &str, price: Decimal, stock: u32) -> Product {
        let product = Product::new(name, Price::new(price).unwrap(), stock);
        self.market
            .register_product(&self.admin, product)
            .await
            .unwrap()
    }

    pub async fn live_listing(
        &self,
        seller: &Caller,
        name: &str,
        quantity: u32,
        rent_per_day: Decimal,
        platform_fee: Decimal,
    ) -> ItemListing {
        let listing = self
            .market
            .register_listing(
                seller,
                ListingDraft {
                    listing_id: None,
                    item_name: name.to_string(),
                    quantity,
                    rent_per_day: Price::new(rent_per_day).unwrap(),
                    platform_fee: Money::new(platform_fee),
                    security_deposit: Money::new(Decimal::from(100)),
                },
            )
            .await
            .unwrap();
        self.market
            .review_listing(&self.admin, listing.id, true)
            .await
            .unwrap()
    }
}
