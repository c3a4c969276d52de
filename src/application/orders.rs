use super::access::AccessPolicy;
use super::engine::Marketplace;
use super::stock::StockLedger;
use crate::domain::ids::{OrderId, ProductId};
use crate::domain::message::ThreadRef;
use crate::domain::money::Money;
use crate::domain::order::{Order, OrderItem, OrderStatus, OrderUpdate, PaymentMethod};
use crate::domain::user::Caller;
use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewOrder {
    /// Client-chosen id; generated when absent.
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub items: Vec<OrderLine>,
    pub payment_method: PaymentMethod,
    pub total_amount: Money,
    /// Reference to the UPI payment proof. Required for UPI orders.
    #[serde(default)]
    pub payment_proof: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl Marketplace {
    /// Places an order for the caller.
    ///
    /// Stock for every line is reserved when the order is created, whatever
    /// the payment method, and the item prices are frozen at the current
    /// catalog price. The stated total must match those prices.
    pub async fn create_order(&self, caller: &Caller, request: NewOrder) -> Result<OrderReceipt> {
        if request.items.is_empty() {
            return Err(MarketError::InvalidInput(
                "Order must contain at least one item".to_string(),
            ));
        }
        if let Some(line) = request.items.iter().find(|line| line.quantity == 0) {
            return Err(MarketError::InvalidInput(format!(
                "Quantity for product {} must be at least 1",
                line.product_id
            )));
        }
        let payment_proof = request
            .payment_proof
            .map(|proof| proof.trim().to_string())
            .filter(|proof| !proof.is_empty());
        if request.payment_method == PaymentMethod::Upi && payment_proof.is_none() {
            return Err(MarketError::InvalidInput(
                "UPI orders need a payment proof".to_string(),
            ));
        }

        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;

        let mut order = Order::new(
            caller.user_id,
            request.payment_method,
            request.total_amount,
            payment_proof,
            now,
        );
        if let Some(order_id) = request.order_id {
            if uow.order(order_id).await?.is_some() {
                return Err(MarketError::Conflict(format!(
                    "Order {order_id} already exists"
                )));
            }
            order.id = order_id;
        }

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = StockLedger::reserve(uow.as_mut(), line.product_id, line.quantity).await?;
            items.push(OrderItem {
                id: Default::default(),
                order_id: order.id,
                product_id: product.id,
                product_name: product.name,
                quantity: line.quantity,
                price_at_time: product.price,
            });
        }

        let computed = items.iter().try_fold(Money::ZERO, |total, item| {
            total.checked_add(item.line_total()?)
        })?;
        if computed != request.total_amount {
            return Err(MarketError::InvalidInput(format!(
                "Order total {} does not match item prices totalling {}",
                request.total_amount, computed
            )));
        }
        order.total_amount = computed;

        uow.put_order(order.clone()).await?;
        for item in items {
            uow.put_order_item(item).await?;
        }
        uow.commit().await?;

        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            total = %order.total_amount,
            payment_method = ?order.payment_method,
            "order created"
        );
        Ok(OrderReceipt {
            order_id: order.id,
            status: order.status,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
        })
    }

    /// Applies administrator updates in order. Either all of them land or
    /// none do.
    pub async fn transition_order(
        &self,
        caller: &Caller,
        order_id: OrderId,
        updates: Vec<OrderUpdate>,
    ) -> Result<Order> {
        if updates.is_empty() {
            return Err(MarketError::InvalidInput(
                "No order updates supplied".to_string(),
            ));
        }
        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        AccessPolicy::require_admin(caller)?;

        let mut order = uow
            .order(order_id)
            .await?
            .ok_or_else(|| MarketError::not_found("order", order_id))?;
        let previous = order.status;
        for update in updates {
            order.apply(update, now)?;
        }
        uow.put_order(order.clone()).await?;
        uow.commit().await?;

        info!(%order_id, from = %previous, to = %order.status, "order updated");
        Ok(order)
    }

    /// Cancels an order and puts its stock back.
    pub async fn cancel_order(&self, caller: &Caller, order_id: OrderId) -> Result<Order> {
        let mut uow = self.begin().await?;
        let now = self.now();
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;

        let mut order = uow
            .order(order_id)
            .await?
            .ok_or_else(|| MarketError::not_found("order", order_id))?;
        AccessPolicy::order_access(caller, &order)?;

        let by = if caller.is_admin() { "admin" } else { "customer" };
        order.cancel(
            &format!("Cancelled by {by} at {}", now.format("%Y-%m-%d %H:%M UTC")),
            now,
        )?;

        for item in uow.order_items(order_id).await? {
            match StockLedger::release(uow.as_mut(), item.product_id, item.quantity).await {
                Ok(_) => {}
                Err(MarketError::NotFound { .. }) => {
                    warn!(%order_id, product_id = %item.product_id, "cancelled item's product no longer exists");
                }
                Err(e) => return Err(e),
            }
        }
        uow.put_order(order.clone()).await?;
        uow.commit().await?;

        info!(%order_id, cancelled_by = by, "order cancelled");
        Ok(order)
    }

    /// Removes an order with its items and message thread. Stock still held
    /// by an open order is released first.
    pub async fn delete_order(&self, caller: &Caller, order_id: OrderId) -> Result<()> {
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        AccessPolicy::require_admin(caller)?;

        let order = uow
            .order(order_id)
            .await?
            .ok_or_else(|| MarketError::not_found("order", order_id))?;

        if !order.status.is_terminal() {
            for item in uow.order_items(order_id).await? {
                if let Err(e) =
                    StockLedger::release(uow.as_mut(), item.product_id, item.quantity).await
                    && !matches!(e, MarketError::NotFound { .. })
                {
                    return Err(e);
                }
            }
        }
        let removed = uow.delete_order_items(order_id).await?;
        let messages = uow.delete_messages(ThreadRef::Order(order_id)).await?;
        uow.delete_order(order_id).await?;
        uow.commit().await?;

        info!(%order_id, items = removed, messages, "order deleted");
        Ok(())
    }

    pub async fn order(&self, caller: &Caller, order_id: OrderId) -> Result<OrderDetails> {
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        let order = uow
            .order(order_id)
            .await?
            .ok_or_else(|| MarketError::not_found("order", order_id))?;
        AccessPolicy::order_access(caller, &order)?;
        let items = uow.order_items(order_id).await?;
        Ok(OrderDetails { order, items })
    }

    /// The caller's orders, newest first. Administrators see every order.
    pub async fn orders(&self, caller: &Caller) -> Result<Vec<Order>> {
        let mut uow = self.begin().await?;
        AccessPolicy::authenticate(uow.as_mut(), caller).await?;
        let mut orders: Vec<Order> = uow
            .all_orders()
            .await?
            .into_iter()
            .filter(|order| caller.is_admin() || order.user_id == caller.user_id)
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
