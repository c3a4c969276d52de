use crate::application::catalog::ListingDraft;
use crate::application::engine::Marketplace;
use crate::application::orders::NewOrder;
use crate::application::rentals::CheckoutRequest;
use crate::domain::ids::{ListingId, OrderId, ProductId, RentalId};
use crate::domain::message::ThreadRef;
use crate::domain::money::Price;
use crate::domain::order::OrderUpdate;
use crate::domain::product::Product;
use crate::domain::user::{Caller, ContactUpdate, UserProfile};
use crate::error::Result;
use serde::Deserialize;
use tracing::debug;

/// One line of a replay file. `op` selects the operation; every operation
/// except user registration names its caller.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    RegisterUser {
        profile: UserProfile,
    },
    UpdateContact {
        caller: Caller,
        contact: ContactUpdate,
    },
    RegisterProduct {
        caller: Caller,
        product_id: ProductId,
        name: String,
        price: Price,
        stock_quantity: u32,
    },
    SetProductPrice {
        caller: Caller,
        product_id: ProductId,
        price: Price,
    },
    SetProductAvailability {
        caller: Caller,
        product_id: ProductId,
        is_available: bool,
    },
    RestockProduct {
        caller: Caller,
        product_id: ProductId,
        quantity: u32,
    },
    RegisterListing {
        caller: Caller,
        listing: ListingDraft,
    },
    ReviewListing {
        caller: Caller,
        listing_id: ListingId,
        approve: bool,
    },
    CreateOrder {
        caller: Caller,
        order: NewOrder,
    },
    TransitionOrder {
        caller: Caller,
        order_id: OrderId,
        updates: Vec<OrderUpdate>,
    },
    CancelOrder {
        caller: Caller,
        order_id: OrderId,
    },
    DeleteOrder {
        caller: Caller,
        order_id: OrderId,
    },
    CheckoutRental {
        caller: Caller,
        checkout: CheckoutRequest,
    },
    ActivateRental {
        caller: Caller,
        rental_id: RentalId,
    },
    AccrueRental {
        caller: Caller,
        rental_id: RentalId,
    },
    CompleteRental {
        caller: Caller,
        rental_id: RentalId,
    },
    CancelRental {
        caller: Caller,
        rental_id: RentalId,
    },
    RecordPayout {
        caller: Caller,
        rental_id: RentalId,
    },
    PostMessage {
        caller: Caller,
        thread: ThreadRef,
        text: String,
    },
    MarkMessagesRead {
        caller: Caller,
        thread: ThreadRef,
    },
}

impl Command {
    pub fn op(&self) -> &'static str {
        match self {
            Self::RegisterUser { .. } => "register_user",
            Self::UpdateContact { .. } => "update_contact",
            Self::RegisterProduct { .. } => "register_product",
            Self::SetProductPrice { .. } => "set_product_price",
            Self::SetProductAvailability { .. } => "set_product_availability",
            Self::RestockProduct { .. } => "restock_product",
            Self::RegisterListing { .. } => "register_listing",
            Self::ReviewListing { .. } => "review_listing",
            Self::CreateOrder { .. } => "create_order",
            Self::TransitionOrder { .. } => "transition_order",
            Self::CancelOrder { .. } => "cancel_order",
            Self::DeleteOrder { .. } => "delete_order",
            Self::CheckoutRental { .. } => "checkout_rental",
            Self::ActivateRental { .. } => "activate_rental",
            Self::AccrueRental { .. } => "accrue_rental",
            Self::CompleteRental { .. } => "complete_rental",
            Self::CancelRental { .. } => "cancel_rental",
            Self::RecordPayout { .. } => "record_payout",
            Self::PostMessage { .. } => "post_message",
            Self::MarkMessagesRead { .. } => "mark_messages_read",
        }
    }

    /// Runs the command against `market`. Results are logged; the replay
    /// only reports failures.
    pub async fn apply(self, market: &Marketplace) -> Result<()> {
        let op = self.op();
        match self {
            Self::RegisterUser { profile } => {
                market.register_user(profile).await?;
            }
            Self::UpdateContact { caller, contact } => {
                market.update_user_contact(&caller, contact).await?;
            }
            Self::RegisterProduct {
                caller,
                product_id,
                name,
                price,
                stock_quantity,
            } => {
                let mut product = Product::new(name, price, stock_quantity);
                product.id = product_id;
                market.register_product(&caller, product).await?;
            }
            Self::SetProductPrice {
                caller,
                product_id,
                price,
            } => {
                market.set_product_price(&caller, product_id, price).await?;
            }
            Self::SetProductAvailability {
                caller,
                product_id,
                is_available,
            } => {
                market
                    .set_product_availability(&caller, product_id, is_available)
                    .await?;
            }
            Self::RestockProduct {
                caller,
                product_id,
                quantity,
            } => {
                market.restock_product(&caller, product_id, quantity).await?;
            }
            Self::RegisterListing { caller, listing } => {
                market.register_listing(&caller, listing).await?;
            }
            Self::ReviewListing {
                caller,
                listing_id,
                approve,
            } => {
                market.review_listing(&caller, listing_id, approve).await?;
            }
            Self::CreateOrder { caller, order } => {
                let receipt = market.create_order(&caller, order).await?;
                debug!(op, ?receipt, "command applied");
            }
            Self::TransitionOrder {
                caller,
                order_id,
                updates,
            } => {
                market.transition_order(&caller, order_id, updates).await?;
            }
            Self::CancelOrder { caller, order_id } => {
                market.cancel_order(&caller, order_id).await?;
            }
            Self::DeleteOrder { caller, order_id } => {
                market.delete_order(&caller, order_id).await?;
            }
            Self::CheckoutRental { caller, checkout } => {
                let receipt = market.checkout_rental(&caller, checkout).await?;
                debug!(op, breakdown = ?receipt.breakdown, "command applied");
            }
            Self::ActivateRental { caller, rental_id } => {
                market.activate_rental(&caller, rental_id).await?;
            }
            Self::AccrueRental { caller, rental_id } => {
                market.accrue_rental(&caller, rental_id).await?;
            }
            Self::CompleteRental { caller, rental_id } => {
                market.complete_rental(&caller, rental_id).await?;
            }
            Self::CancelRental { caller, rental_id } => {
                market.cancel_rental(&caller, rental_id).await?;
            }
            Self::RecordPayout { caller, rental_id } => {
                let payout = market.record_payout(&caller, rental_id).await?;
                debug!(op, ?payout, "command applied");
            }
            Self::PostMessage {
                caller,
                thread,
                text,
            } => {
                market.post_message(&caller, thread, &text).await?;
            }
            Self::MarkMessagesRead { caller, thread } => {
                let flipped = market.mark_messages_read(&caller, thread).await?;
                debug!(op, flipped, "command applied");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::Role;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::in_memory::InMemoryMarketStore;
    use crate::interfaces::jsonl::command_reader::CommandReader;

    #[tokio::test]
    async fn test_replay_registers_and_orders() {
        let script = r#"
{"op":"register_user","profile":{"id":"00000000-0000-0000-0000-000000000001","name":"Admin","email":"a@campus.edu","role":"ADMIN"}}
{"op":"register_user","profile":{"id":"00000000-0000-0000-0000-000000000002","name":"Priya","email":"p@campus.edu","role":"CUSTOMER"}}
{"op":"register_product","caller":{"user_id":"00000000-0000-0000-0000-000000000001","role":"ADMIN"},"product_id":"00000000-0000-0000-0000-0000000000c1","name":"Pens","price":"10","stock_quantity":5}
{"op":"create_order","caller":{"user_id":"00000000-0000-0000-0000-000000000002","role":"CUSTOMER"},"order":{"order_id":"00000000-0000-0000-0000-0000000000a1","items":[{"product_id":"00000000-0000-0000-0000-0000000000c1","quantity":5}],"payment_method":"COD","total_amount":"50"}}
{"op":"create_order","caller":{"user_id":"00000000-0000-0000-0000-000000000002","role":"CUSTOMER"},"order":{"items":[{"product_id":"00000000-0000-0000-0000-0000000000c1","quantity":1}],"payment_method":"COD","total_amount":"10"}}
"#;
        let market = Marketplace::new(Box::new(InMemoryMarketStore::new()), Box::new(SystemClock));
        let mut outcomes = Vec::new();
        for command in CommandReader::new(script.as_bytes()).commands() {
            outcomes.push(command.unwrap().apply(&market).await);
        }

        assert!(outcomes[..4].iter().all(|outcome| outcome.is_ok()));
        assert!(matches!(
            outcomes[4],
            Err(crate::error::MarketError::InsufficientStock { .. })
        ));

        let caller = Caller {
            user_id: uuid::Uuid::from_u128(2).into(),
            role: Role::Customer,
        };
        let details = market
            .order(&caller, uuid::Uuid::from_u128(0xa1).into())
            .await
            .unwrap();
        assert_eq!(details.items.len(), 1);
        assert_eq!(details.items[0].quantity, 5);
    }
}
