use crate::domain::ids::{ListingId, OrderId, ProductId, RentalId, UserId};
use crate::domain::listing::ItemListing;
use crate::domain::message::{Message, ThreadRef};
use crate::domain::order::{Order, OrderItem};
use crate::domain::ports::{MarketStore, UnitOfWork, UnitOfWorkBox};
use crate::domain::product::Product;
use crate::domain::rental::RentalTransaction;
use crate::domain::user::UserProfile;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
struct MarketState {
    users: HashMap<UserId, UserProfile>,
    products: HashMap<ProductId, Product>,
    listings: HashMap<ListingId, ItemListing>,
    orders: HashMap<OrderId, Order>,
    order_items: HashMap<OrderId, Vec<OrderItem>>,
    rentals: HashMap<RentalId, RentalTransaction>,
    messages: HashMap<ThreadRef, Vec<Message>>,
}

/// Pending writes of one unit. `None` marks a deleted row.
type Overlay<K, V> = HashMap<K, Option<V>>;

#[derive(Default)]
struct StagedWrites {
    users: Overlay<UserId, UserProfile>,
    products: Overlay<ProductId, Product>,
    listings: Overlay<ListingId, ItemListing>,
    orders: Overlay<OrderId, Order>,
    order_items: Overlay<OrderId, Vec<OrderItem>>,
    rentals: Overlay<RentalId, RentalTransaction>,
    messages: Overlay<ThreadRef, Vec<Message>>,
}

/// A thread-safe in-memory store.
///
/// A unit of work holds the store's mutex for its whole life. Writes are
/// staged in an overlay over the committed state and applied on commit; reads
/// clone only the rows they return. Suited to tests and replays where
/// persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryMarketStore {
    state: Arc<Mutex<MarketState>>,
}

impl InMemoryMarketStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn begin(&self) -> Result<UnitOfWorkBox> {
        let committed = self.state.clone().lock_owned().await;
        Ok(Box::new(InMemoryUnitOfWork {
            committed,
            staged: StagedWrites::default(),
        }))
    }
}

pub struct InMemoryUnitOfWork {
    committed: OwnedMutexGuard<MarketState>,
    staged: StagedWrites,
}

fn read<K: Eq + Hash, V: Clone>(
    staged: &Overlay<K, V>,
    committed: &HashMap<K, V>,
    key: &K,
) -> Option<V> {
    match staged.get(key) {
        Some(entry) => entry.clone(),
        None => committed.get(key).cloned(),
    }
}

fn read_all<K: Eq + Hash, V: Clone>(staged: &Overlay<K, V>, committed: &HashMap<K, V>) -> Vec<V> {
    committed
        .iter()
        .filter(|(key, _)| !staged.contains_key(key))
        .map(|(_, value)| value.clone())
        .chain(staged.values().flatten().cloned())
        .collect()
}

/// The staged slot for `key`, seeded from the committed row on first touch.
fn slot<'a, K: Eq + Hash + Copy, V: Clone>(
    staged: &'a mut Overlay<K, V>,
    committed: &HashMap<K, V>,
    key: K,
) -> &'a mut Option<V> {
    staged
        .entry(key)
        .or_insert_with(|| committed.get(&key).cloned())
}

fn apply<K: Eq + Hash, V>(staged: Overlay<K, V>, committed: &mut HashMap<K, V>) {
    for (key, entry) in staged {
        match entry {
            Some(value) => {
                committed.insert(key, value);
            }
            None => {
                committed.remove(&key);
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn user(&mut self, id: UserId) -> Result<Option<UserProfile>> {
        Ok(read(&self.staged.users, &self.committed.users, &id))
    }

    async fn put_user(&mut self, user: UserProfile) -> Result<()> {
        self.staged.users.insert(user.id, Some(user));
        Ok(())
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(read(&self.staged.products, &self.committed.products, &id))
    }

    async fn put_product(&mut self, product: Product) -> Result<()> {
        self.staged.products.insert(product.id, Some(product));
        Ok(())
    }

    async fn all_products(&mut self) -> Result<Vec<Product>> {
        Ok(read_all(&self.staged.products, &self.committed.products))
    }

    async fn listing(&mut self, id: ListingId) -> Result<Option<ItemListing>> {
        Ok(read(&self.staged.listings, &self.committed.listings, &id))
    }

    async fn put_listing(&mut self, listing: ItemListing) -> Result<()> {
        self.staged.listings.insert(listing.id, Some(listing));
        Ok(())
    }

    async fn all_listings(&mut self) -> Result<Vec<ItemListing>> {
        Ok(read_all(&self.staged.listings, &self.committed.listings))
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(read(&self.staged.orders, &self.committed.orders, &id))
    }

    async fn put_order(&mut self, order: Order) -> Result<()> {
        self.staged.orders.insert(order.id, Some(order));
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<()> {
        self.staged.orders.insert(id, None);
        Ok(())
    }

    async fn all_orders(&mut self) -> Result<Vec<Order>> {
        Ok(read_all(&self.staged.orders, &self.committed.orders))
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let items = read(&self.staged.order_items, &self.committed.order_items, &order_id);
        Ok(items.unwrap_or_default())
    }

    async fn put_order_item(&mut self, item: OrderItem) -> Result<()> {
        let items = slot(
            &mut self.staged.order_items,
            &self.committed.order_items,
            item.order_id,
        )
        .get_or_insert_with(Vec::new);
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
        Ok(())
    }

    async fn delete_order_items(&mut self, order_id: OrderId) -> Result<usize> {
        Ok(slot(&mut self.staged.order_items, &self.committed.order_items, order_id)
            .take()
            .map_or(0, |items| items.len()))
    }

    async fn rental(&mut self, id: RentalId) -> Result<Option<RentalTransaction>> {
        Ok(read(&self.staged.rentals, &self.committed.rentals, &id))
    }

    async fn put_rental(&mut self, rental: RentalTransaction) -> Result<()> {
        self.staged.rentals.insert(rental.id, Some(rental));
        Ok(())
    }

    async fn all_rentals(&mut self) -> Result<Vec<RentalTransaction>> {
        Ok(read_all(&self.staged.rentals, &self.committed.rentals))
    }

    async fn messages(&mut self, thread: ThreadRef) -> Result<Vec<Message>> {
        let messages = read(&self.staged.messages, &self.committed.messages, &thread);
        Ok(messages.unwrap_or_default())
    }

    async fn put_message(&mut self, message: Message) -> Result<()> {
        let thread = slot(
            &mut self.staged.messages,
            &self.committed.messages,
            message.thread,
        )
        .get_or_insert_with(Vec::new);
        match thread.iter_mut().find(|existing| existing.id == message.id) {
            Some(existing) => *existing = message,
            None => thread.push(message),
        }
        Ok(())
    }

    async fn delete_messages(&mut self, thread: ThreadRef) -> Result<usize> {
        Ok(slot(&mut self.staged.messages, &self.committed.messages, thread)
            .take()
            .map_or(0, |messages| messages.len()))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self {
            mut committed,
            staged,
        } = *self;
        let state = &mut *committed;
        apply(staged.users, &mut state.users);
        apply(staged.products, &mut state.products);
        apply(staged.listings, &mut state.listings);
        apply(staged.orders, &mut state.orders);
        apply(staged.order_items, &mut state.order_items);
        apply(staged.rentals, &mut state.rentals);
        apply(staged.messages, &mut state.messages);
        Ok(())
    }
}
