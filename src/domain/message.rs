use super::ids::{MessageId, OrderId, RentalId, UserId};
use crate::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest message body accepted on any thread, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// The transaction a message thread hangs off.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ThreadRef {
    Order(OrderId),
    Rental(RentalId),
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order(id) => write!(f, "order:{id}"),
            Self::Rental(id) => write!(f, "rental:{id}"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderRole {
    Customer,
    Admin,
    Renter,
    Seller,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Message {
    pub id: MessageId,
    pub thread: ThreadRef,
    pub sender_id: UserId,
    pub sender_role: SenderRole,
    pub text: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Builds a message from raw input, trimming and length-checking the body.
    pub fn compose(
        thread: ThreadRef,
        sender_id: UserId,
        sender_role: SenderRole,
        raw_text: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, MarketError> {
        let text = raw_text.trim();
        if text.is_empty() {
            return Err(MarketError::InvalidInput(
                "Message cannot be empty".to_string(),
            ));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(MarketError::InvalidInput(format!(
                "Message cannot exceed {MAX_MESSAGE_CHARS} characters"
            )));
        }
        Ok(Self {
            id: MessageId::new(),
            thread,
            sender_id,
            sender_role,
            text: text.to_string(),
            is_read: false,
            created_at: now,
        })
    }
}
