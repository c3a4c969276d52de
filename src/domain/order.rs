use super::ids::{OrderId, OrderItemId, ProductId, UserId};
use super::money::{Money, Price};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    #[serde(alias = "READY")]
    OutForDelivery,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum PaymentMethod {
    #[serde(rename = "UPI")]
    Upi,
    #[serde(rename = "COD")]
    Cod,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

/// One line of an order. The price is frozen when the order is placed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price_at_time: Price,
}

impl OrderItem {
    pub fn line_total(&self) -> Result<Money, MarketError> {
        self.price_at_time.as_money().checked_mul(self.quantity)
    }
}

/// A retail order. Its items live in their own records keyed by `order_id`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_amount: Money,
    /// Opaque reference to the customer's UPI payment proof.
    pub payment_proof: Option<String>,
    pub transaction_id: Option<String>,
    pub admin_notes: Option<String>,
    pub delivery_method: Option<String>,
    pub room_number: Option<String>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The mutations an administrator may apply to an order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum OrderUpdate {
    Status(OrderStatus),
    PaymentStatus(PaymentStatus),
    AdminNotes(String),
    DeliveryMethod(String),
    RoomNumber(String),
    EstimatedDeliveryTime(DateTime<Utc>),
    PaymentMethod(PaymentMethod),
    TransactionId(String),
}

impl Order {
    pub fn new(
        user_id: UserId,
        payment_method: PaymentMethod,
        total_amount: Money,
        payment_proof: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Pending,
            payment_method,
            payment_status: PaymentStatus::Pending,
            total_amount,
            payment_proof,
            transaction_id: None,
            admin_notes: None,
            delivery_method: None,
            room_number: None,
            estimated_delivery_time: None,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            ready_at: None,
            completed_at: None,
        }
    }

    pub fn apply(&mut self, update: OrderUpdate, now: DateTime<Utc>) -> Result<(), MarketError> {
        match update {
            OrderUpdate::Status(status) => self.enter_status(status, now)?,
            OrderUpdate::PaymentStatus(payment_status) => {
                self.payment_status = payment_status;
                if payment_status == PaymentStatus::Completed
                    && self.status == OrderStatus::Pending
                {
                    self.status = OrderStatus::Confirmed;
                    self.confirmed_at.get_or_insert(now);
                }
            }
            OrderUpdate::AdminNotes(notes) => self.admin_notes = Some(notes),
            OrderUpdate::DeliveryMethod(method) => self.delivery_method = Some(method),
            OrderUpdate::RoomNumber(room) => self.room_number = Some(room),
            OrderUpdate::EstimatedDeliveryTime(at) => self.estimated_delivery_time = Some(at),
            OrderUpdate::PaymentMethod(method) => self.payment_method = method,
            OrderUpdate::TransactionId(id) => self.transaction_id = Some(id),
        }
        self.updated_at = now;
        Ok(())
    }

    fn enter_status(&mut self, status: OrderStatus, now: DateTime<Utc>) -> Result<(), MarketError> {
        if status == self.status {
            return Ok(());
        }
        if self.status.is_terminal() {
            return Err(MarketError::InvalidTransition(format!(
                "Order {} is {} and cannot move to {}",
                self.id, self.status, status
            )));
        }
        match status {
            OrderStatus::Cancelled => {
                return Err(MarketError::InvalidTransition(
                    "Orders are cancelled through cancellation, which restores stock".to_string(),
                ));
            }
            OrderStatus::Pending => {
                return Err(MarketError::InvalidTransition(format!(
                    "Order {} cannot return to PENDING from {}",
                    self.id, self.status
                )));
            }
            OrderStatus::Confirmed => {
                self.confirmed_at.get_or_insert(now);
            }
            OrderStatus::OutForDelivery => {
                self.ready_at.get_or_insert(now);
            }
            OrderStatus::Completed => {
                self.completed_at.get_or_insert(now);
            }
        }
        self.status = status;
        Ok(())
    }

    /// Moves the order to CANCELLED. Stock restoration is the caller's job.
    pub fn cancel(&mut self, note: &str, now: DateTime<Utc>) -> Result<(), MarketError> {
        if self.status.is_terminal() {
            return Err(MarketError::InvalidTransition(format!(
                "Order {} is already {} and cannot be cancelled",
                self.id, self.status
            )));
        }
        self.status = OrderStatus::Cancelled;
        self.completed_at.get_or_insert(now);
        self.append_note(note);
        self.updated_at = now;
        Ok(())
    }

    fn append_note(&mut self, note: &str) {
        self.admin_notes = Some(match self.admin_notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
            _ => note.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn pending_order(now: DateTime<Utc>) -> Order {
        Order::new(
            UserId::new(),
            PaymentMethod::Cod,
            Money::new(dec!(30)),
            None,
            now,
        )
    }

    #[test]
    fn test_payment_completion_confirms_pending_order() {
        let now = Utc::now();
        let mut order = pending_order(now);
        order
            .apply(OrderUpdate::PaymentStatus(PaymentStatus::Completed), now)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.confirmed_at, Some(now));

        let later = now + Duration::hours(2);
        order
            .apply(OrderUpdate::PaymentStatus(PaymentStatus::Completed), later)
            .unwrap();
        assert_eq!(order.confirmed_at, Some(now));
    }

    #[test]
    fn test_timestamps_are_stamped_once() {
        let now = Utc::now();
        let mut order = pending_order(now);
        order
            .apply(OrderUpdate::Status(OrderStatus::OutForDelivery), now)
            .unwrap();
        assert_eq!(order.ready_at, Some(now));

        let later = now + Duration::minutes(30);
        order
            .apply(OrderUpdate::Status(OrderStatus::Confirmed), later)
            .unwrap();
        order
            .apply(OrderUpdate::Status(OrderStatus::OutForDelivery), later)
            .unwrap();
        assert_eq!(order.ready_at, Some(now));

        order
            .apply(OrderUpdate::Status(OrderStatus::Completed), later)
            .unwrap();
        assert_eq!(order.completed_at, Some(later));
    }

    #[test]
    fn test_terminal_orders_do_not_move() {
        let now = Utc::now();
        let mut order = pending_order(now);
        order
            .apply(OrderUpdate::Status(OrderStatus::Completed), now)
            .unwrap();
        let err = order
            .apply(OrderUpdate::Status(OrderStatus::Confirmed), now)
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidTransition(_)));
        // Same status again is a no-op.
        order
            .apply(OrderUpdate::Status(OrderStatus::Completed), now)
            .unwrap();
    }

    #[test]
    fn test_status_update_cannot_cancel() {
        let now = Utc::now();
        let mut order = pending_order(now);
        assert!(matches!(
            order.apply(OrderUpdate::Status(OrderStatus::Cancelled), now),
            Err(MarketError::InvalidTransition(_))
        ));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_cancel_appends_note_and_rejects_twice() {
        let now = Utc::now();
        let mut order = pending_order(now);
        order
            .apply(OrderUpdate::AdminNotes("leave at desk".into()), now)
            .unwrap();
        order.cancel("Cancelled by customer", now).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.completed_at, Some(now));
        assert_eq!(
            order.admin_notes.as_deref(),
            Some("leave at desk\nCancelled by customer")
        );
        assert!(matches!(
            order.cancel("again", now),
            Err(MarketError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_update_decoding_rejects_unknown_fields_and_statuses() {
        let ok: OrderUpdate =
            serde_json::from_str(r#"{"field":"status","value":"READY"}"#).unwrap();
        assert_eq!(ok, OrderUpdate::Status(OrderStatus::OutForDelivery));

        assert!(serde_json::from_str::<OrderUpdate>(r#"{"field":"total_amount","value":"1"}"#).is_err());
        assert!(serde_json::from_str::<OrderUpdate>(r#"{"field":"status","value":"SHIPPED"}"#).is_err());
    }
}
