#![allow(dead_code)]

use campus_market::application::engine::Marketplace;
use campus_market::domain::user::{Caller, Role, UserProfile};
use campus_market::infrastructure::clock::ManualClock;
use campus_market::infrastructure::in_memory::InMemoryMarketStore;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::io::{Error, Write};
use tempfile::NamedTempFile;
use uuid::Uuid;

pub const ADMIN: &str = "00000000-0000-0000-0000-000000000001";
pub const PRIYA: &str = "00000000-0000-0000-0000-000000000002";
pub const SAM: &str = "00000000-0000-0000-0000-000000000003";
pub const IRA: &str = "00000000-0000-0000-0000-000000000004";

pub const PENS: &str = "00000000-0000-0000-0000-0000000000c1";
pub const TENT: &str = "00000000-0000-0000-0000-0000000000d1";
pub const ORDER_1: &str = "00000000-0000-0000-0000-0000000000a1";
pub const RENTAL_1: &str = "00000000-0000-0000-0000-0000000000b1";

pub fn caller(user_id: &str, role: &str) -> Value {
    json!({ "user_id": user_id, "role": role })
}

pub fn register_user(id: &str, name: &str, role: &str) -> Value {
    json!({
        "op": "register_user",
        "profile": {
            "id": id,
            "name": name,
            "email": format!("{}@campus.edu", name.to_lowercase()),
            "phone": "555-0100",
            "room": "H-101",
            "role": role,
        }
    })
}

/// Admin, two customers, a product with `pens_stock` units and a live tent
/// listing with `tent_quantity` units owned by Sam.
pub fn seed(pens_stock: u32, tent_quantity: u32) -> Vec<Value> {
    vec![
        register_user(ADMIN, "Admin", "ADMIN"),
        register_user(PRIYA, "Priya", "CUSTOMER"),
        register_user(SAM, "Sam", "CUSTOMER"),
        register_user(IRA, "Ira", "CUSTOMER"),
        json!({
            "op": "register_product",
            "caller": caller(ADMIN, "ADMIN"),
            "product_id": PENS,
            "name": "Pens",
            "price": "10",
            "stock_quantity": pens_stock,
        }),
        json!({
            "op": "register_listing",
            "caller": caller(SAM, "CUSTOMER"),
            "listing": {
                "listing_id": TENT,
                "item_name": "Tent",
                "quantity": tent_quantity,
                "rent_per_day": "10",
                "platform_fee": "2",
                "security_deposit": "100",
            }
        }),
        json!({
            "op": "review_listing",
            "caller": caller(ADMIN, "ADMIN"),
            "listing_id": TENT,
            "approve": true,
        }),
    ]
}

pub fn cod_order(order_id: Option<&str>, qty: u32) -> Value {
    json!({
        "op": "create_order",
        "caller": caller(PRIYA, "CUSTOMER"),
        "order": {
            "order_id": order_id,
            "items": [{ "product_id": PENS, "quantity": qty }],
            "payment_method": "COD",
            "total_amount": (10 * qty).to_string(),
        }
    })
}

pub fn checkout(renter: &str, rental_id: Option<&str>, days: u32) -> Value {
    json!({
        "op": "checkout_rental",
        "caller": caller(renter, "CUSTOMER"),
        "checkout": {
            "rental_id": rental_id,
            "listing_id": TENT,
            "rental_days": days,
            "payment_pin": "2468",
            "payment_method": "UPI",
        }
    })
}

/// Writes one command per line to a temporary file.
pub fn write_script(commands: &[Value]) -> Result<NamedTempFile, Error> {
    let mut file = NamedTempFile::new()?;
    for command in commands {
        writeln!(file, "{command}")?;
    }
    file.flush()?;
    Ok(file)
}

pub struct TestMarket {
    pub market: Marketplace,
    pub clock: ManualClock,
    pub admin: Caller,
}

/// An in-memory marketplace on a manual clock with one admin registered.
pub async fn test_market() -> TestMarket {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap());
    let market = Marketplace::new(Box::new(InMemoryMarketStore::new()), Box::new(clock.clone()));
    let admin = UserProfile::new("Admin", "admin@campus.edu", Role::Admin);
    market.register_user(admin.clone()).await.unwrap();
    TestMarket {
        market,
        clock,
        admin: Caller::admin(admin.id),
    }
}

pub async fn customer(market: &Marketplace, name: &str) -> Caller {
    let profile = UserProfile::new(name, format!("{}@campus.edu", name.to_lowercase()), Role::Customer)
        .with_contact("555-0101", "B-202");
    market.register_user(profile.clone()).await.unwrap();
    Caller::customer(profile.id)
}

pub fn id(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap()
}
