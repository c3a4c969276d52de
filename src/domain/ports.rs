use super::ids::{ListingId, OrderId, ProductId, RentalId, UserId};
use super::listing::ItemListing;
use super::message::{Message, ThreadRef};
use super::order::{Order, OrderItem};
use super::product::Product;
use super::rental::RentalTransaction;
use super::user::UserProfile;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage backend for every marketplace entity.
///
/// All access goes through a [`UnitOfWork`]; a store serializes the units it
/// hands out so that counters read inside one cannot change underneath it.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn begin(&self) -> Result<UnitOfWorkBox>;
}

/// A staged set of reads and writes.
///
/// Reads observe the unit's own pending writes. `commit` applies every write
/// at once; dropping the unit without committing discards them.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn user(&mut self, id: UserId) -> Result<Option<UserProfile>>;
    async fn put_user(&mut self, user: UserProfile) -> Result<()>;

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>>;
    async fn put_product(&mut self, product: Product) -> Result<()>;
    async fn all_products(&mut self) -> Result<Vec<Product>>;

    async fn listing(&mut self, id: ListingId) -> Result<Option<ItemListing>>;
    async fn put_listing(&mut self, listing: ItemListing) -> Result<()>;
    async fn all_listings(&mut self) -> Result<Vec<ItemListing>>;

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>>;
    async fn put_order(&mut self, order: Order) -> Result<()>;
    async fn delete_order(&mut self, id: OrderId) -> Result<()>;
    async fn all_orders(&mut self) -> Result<Vec<Order>>;

    /// Items of an order in the order they were added.
    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>>;
    async fn put_order_item(&mut self, item: OrderItem) -> Result<()>;
    /// Removes every item of an order and returns how many there were.
    async fn delete_order_items(&mut self, order_id: OrderId) -> Result<usize>;

    async fn rental(&mut self, id: RentalId) -> Result<Option<RentalTransaction>>;
    async fn put_rental(&mut self, rental: RentalTransaction) -> Result<()>;
    async fn all_rentals(&mut self) -> Result<Vec<RentalTransaction>>;

    /// Messages of a thread, oldest first.
    async fn messages(&mut self, thread: ThreadRef) -> Result<Vec<Message>>;
    async fn put_message(&mut self, message: Message) -> Result<()>;
    /// Removes a whole thread and returns how many messages it held.
    async fn delete_messages(&mut self, thread: ThreadRef) -> Result<usize>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type MarketStoreBox = Box<dyn MarketStore>;
pub type UnitOfWorkBox = Box<dyn UnitOfWork>;
pub type ClockBox = Box<dyn Clock>;
