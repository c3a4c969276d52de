use super::access::AccessPolicy;
use super::engine::Marketplace;
use crate::domain::message::{Message, SenderRole, ThreadRef};
use crate::domain::ports::UnitOfWork;
use crate::domain::rental::RentalStatus;
use crate::domain::user::Caller;
use crate::error::{MarketError, Result};
use tracing::{info, warn};

impl Marketplace {
    /// Appends a message to an order or rental thread.
    ///
    /// Order threads are open to the order's owner and to admins. Rental
    /// threads are private to renter and seller and only accept messages
    /// while the rental is ACTIVE.
    pub async fn post_message(
        &self,
        caller: &Caller,
        thread: ThreadRef,
        text: &str,
    ) -> Result<Message> {
        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        let role = thread_access(uow.as_mut(), caller, thread, true).await?;

        let message = Message::compose(thread, caller.user_id, role, text, now)?;
        uow.put_message(message.clone()).await?;
        uow.commit().await?;

        info!(%thread, message_id = %message.id, sender_id = %caller.user_id, "message posted");
        Ok(message)
    }

    /// Marks every message the caller did not write as read. Returns how
    /// many flipped; a second call returns zero.
    pub async fn mark_messages_read(&self, caller: &Caller, thread: ThreadRef) -> Result<usize> {
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        thread_access(uow.as_mut(), caller, thread, false).await?;

        let mut flipped = 0;
        for mut message in uow.messages(thread).await? {
            if message.is_read || message.sender_id == caller.user_id {
                continue;
            }
            message.is_read = true;
            uow.put_message(message).await?;
            flipped += 1;
        }
        if flipped > 0 {
            uow.commit().await?;
            info!(%thread, reader_id = %caller.user_id, flipped, "messages marked read");
        }
        Ok(flipped)
    }

    /// The thread, oldest first.
    pub async fn messages(&self, caller: &Caller, thread: ThreadRef) -> Result<Vec<Message>> {
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        thread_access(uow.as_mut(), caller, thread, false).await?;
        let mut messages = uow.messages(thread).await?;
        messages.sort_by_key(|message| message.created_at);
        Ok(messages)
    }

    pub async fn unread_count(&self, caller: &Caller, thread: ThreadRef) -> Result<usize> {
        Ok(self
            .messages(caller, thread)
            .await?
            .iter()
            .filter(|message| !message.is_read && message.sender_id != caller.user_id)
            .count())
    }
}

/// Resolves the caller's role on a thread. `posting` additionally requires
/// a rental thread's rental to be ACTIVE.
async fn thread_access(
    uow: &mut dyn UnitOfWork,
    caller: &Caller,
    thread: ThreadRef,
    posting: bool,
) -> Result<SenderRole> {
    match thread {
        ThreadRef::Order(order_id) => {
            let order = uow
                .order(order_id)
                .await?
                .ok_or_else(|| MarketError::not_found("order", order_id))?;
            AccessPolicy::order_access(caller, &order)
        }
        ThreadRef::Rental(rental_id) => {
            let rental = uow
                .rental(rental_id)
                .await?
                .ok_or_else(|| MarketError::not_found("rental", rental_id))?;
            let role = AccessPolicy::rental_thread_access(caller, &rental)?;
            if posting && rental.status != RentalStatus::Active {
                warn!(%rental_id, status = %rental.status, "message rejected on inactive rental");
                return Err(MarketError::InvalidTransition(format!(
                    "Rental {rental_id} is {} and its thread is closed",
                    rental.status
                )));
            }
            Ok(role)
        }
    }
}
