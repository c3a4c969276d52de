use crate::domain::ids::{ListingId, OrderId, ProductId, RentalId, UserId};
use crate::domain::listing::ItemListing;
use crate::domain::message::{Message, ThreadRef};
use crate::domain::order::{Order, OrderItem};
use crate::domain::ports::{MarketStore, UnitOfWork, UnitOfWorkBox};
use crate::domain::product::Product;
use crate::domain::rental::RentalTransaction;
use crate::domain::user::UserProfile;
use crate::error::{MarketError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const CF_USERS: &str = "users";
pub const CF_PRODUCTS: &str = "products";
pub const CF_LISTINGS: &str = "listings";
pub const CF_ORDERS: &str = "orders";
/// One value per order holding all of its items.
pub const CF_ORDER_ITEMS: &str = "order_items";
pub const CF_RENTALS: &str = "rentals";
/// Keyed by thread, then creation time, then message id.
pub const CF_MESSAGES: &str = "messages";

const COLUMN_FAMILIES: [&str; 7] = [
    CF_USERS,
    CF_PRODUCTS,
    CF_LISTINGS,
    CF_ORDERS,
    CF_ORDER_ITEMS,
    CF_RENTALS,
    CF_MESSAGES,
];

/// A persistent store implementation using RocksDB.
///
/// Each entity type lives in its own column family with JSON values. A unit
/// of work stages its writes in memory and commits them as one `WriteBatch`,
/// so a multi-entity change lands entirely or not at all.
///
/// Clones share the database handle and the unit-of-work lock.
#[derive(Clone)]
pub struct RocksDBMarketStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBMarketStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }
}

#[async_trait]
impl MarketStore for RocksDBMarketStore {
    async fn begin(&self) -> Result<UnitOfWorkBox> {
        let guard = self.writer.clone().lock_owned().await;
        Ok(Box::new(RocksDBUnitOfWork {
            db: self.db.clone(),
            _guard: guard,
            staged: BTreeMap::new(),
        }))
    }
}

type StagedKey = (&'static str, Vec<u8>);

pub struct RocksDBUnitOfWork {
    db: Arc<DB>,
    _guard: OwnedMutexGuard<()>,
    /// `None` marks a pending delete.
    staged: BTreeMap<StagedKey, Option<Vec<u8>>>,
}

fn thread_prefix(thread: ThreadRef) -> Vec<u8> {
    let (tag, id) = match thread {
        ThreadRef::Order(id) => (b'o', *id.as_bytes()),
        ThreadRef::Rental(id) => (b'r', *id.as_bytes()),
    };
    let mut prefix = Vec::with_capacity(17);
    prefix.push(tag);
    prefix.extend_from_slice(&id);
    prefix
}

fn message_key(message: &Message) -> Vec<u8> {
    let mut key = thread_prefix(message.thread);
    // Flip the sign bit so big-endian bytes sort like the signed value.
    let micros = (message.created_at.timestamp_micros() as u64) ^ (1 << 63);
    key.extend_from_slice(&micros.to_be_bytes());
    key.extend_from_slice(message.id.as_bytes());
    key
}

impl RocksDBUnitOfWork {
    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| MarketError::internal(format!("{name} column family not found")))
    }

    fn get<T: DeserializeOwned>(&self, cf: &'static str, key: &[u8]) -> Result<Option<T>> {
        let bytes = match self.staged.get(&(cf, key.to_vec())) {
            Some(staged) => staged.clone(),
            None => self.db.get_cf(self.cf(cf)?, key)?,
        };
        bytes
            .map(|bytes| serde_json::from_slice(&bytes).map_err(MarketError::from))
            .transpose()
    }

    fn put<T: Serialize>(&mut self, cf: &'static str, key: Vec<u8>, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.staged.insert((cf, key), Some(bytes));
        Ok(())
    }

    fn delete(&mut self, cf: &'static str, key: Vec<u8>) {
        self.staged.insert((cf, key), None);
    }

    /// Every entry whose key starts with `prefix`, with staged writes layered
    /// over what is on disk.
    fn scan_raw(&self, cf: &'static str, prefix: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        let iter = self
            .db
            .iterator_cf(self.cf(cf)?, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            merged.insert(key.to_vec(), value.to_vec());
        }

        for ((staged_cf, key), value) in &self.staged {
            if *staged_cf != cf || !key.starts_with(prefix) {
                continue;
            }
            match value {
                Some(bytes) => merged.insert(key.clone(), bytes.clone()),
                None => merged.remove(key),
            };
        }
        Ok(merged)
    }

    /// Every value whose key starts with `prefix`, in key order.
    fn scan<T: DeserializeOwned>(&self, cf: &'static str, prefix: &[u8]) -> Result<Vec<T>> {
        self.scan_raw(cf, prefix)?
            .values()
            .map(|bytes| serde_json::from_slice(bytes).map_err(MarketError::from))
            .collect()
    }
}

#[async_trait]
impl UnitOfWork for RocksDBUnitOfWork {
    async fn user(&mut self, id: UserId) -> Result<Option<UserProfile>> {
        self.get(CF_USERS, id.as_bytes())
    }

    async fn put_user(&mut self, user: UserProfile) -> Result<()> {
        self.put(CF_USERS, user.id.as_bytes().to_vec(), &user)
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>> {
        self.get(CF_PRODUCTS, id.as_bytes())
    }

    async fn put_product(&mut self, product: Product) -> Result<()> {
        self.put(CF_PRODUCTS, product.id.as_bytes().to_vec(), &product)
    }

    async fn all_products(&mut self) -> Result<Vec<Product>> {
        self.scan(CF_PRODUCTS, &[])
    }

    async fn listing(&mut self, id: ListingId) -> Result<Option<ItemListing>> {
        self.get(CF_LISTINGS, id.as_bytes())
    }

    async fn put_listing(&mut self, listing: ItemListing) -> Result<()> {
        self.put(CF_LISTINGS, listing.id.as_bytes().to_vec(), &listing)
    }

    async fn all_listings(&mut self) -> Result<Vec<ItemListing>> {
        self.scan(CF_LISTINGS, &[])
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.get(CF_ORDERS, id.as_bytes())
    }

    async fn put_order(&mut self, order: Order) -> Result<()> {
        self.put(CF_ORDERS, order.id.as_bytes().to_vec(), &order)
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<()> {
        self.delete(CF_ORDERS, id.as_bytes().to_vec());
        Ok(())
    }

    async fn all_orders(&mut self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS, &[])
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        Ok(self
            .get::<Vec<OrderItem>>(CF_ORDER_ITEMS, order_id.as_bytes())?
            .unwrap_or_default())
    }

    async fn put_order_item(&mut self, item: OrderItem) -> Result<()> {
        let mut items = self.order_items(item.order_id).await?;
        let key = item.order_id.as_bytes().to_vec();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
        self.put(CF_ORDER_ITEMS, key, &items)
    }

    async fn delete_order_items(&mut self, order_id: OrderId) -> Result<usize> {
        let count = self.order_items(order_id).await?.len();
        self.delete(CF_ORDER_ITEMS, order_id.as_bytes().to_vec());
        Ok(count)
    }

    async fn rental(&mut self, id: RentalId) -> Result<Option<RentalTransaction>> {
        self.get(CF_RENTALS, id.as_bytes())
    }

    async fn put_rental(&mut self, rental: RentalTransaction) -> Result<()> {
        self.put(CF_RENTALS, rental.id.as_bytes().to_vec(), &rental)
    }

    async fn all_rentals(&mut self) -> Result<Vec<RentalTransaction>> {
        self.scan(CF_RENTALS, &[])
    }

    async fn messages(&mut self, thread: ThreadRef) -> Result<Vec<Message>> {
        self.scan(CF_MESSAGES, &thread_prefix(thread))
    }

    async fn put_message(&mut self, message: Message) -> Result<()> {
        let key = message_key(&message);
        self.put(CF_MESSAGES, key, &message)
    }

    async fn delete_messages(&mut self, thread: ThreadRef) -> Result<usize> {
        let keys: Vec<Vec<u8>> = self
            .scan_raw(CF_MESSAGES, &thread_prefix(thread))?
            .into_keys()
            .collect();
        let removed = keys.len();
        for key in keys {
            self.delete(CF_MESSAGES, key);
        }
        Ok(removed)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut batch = WriteBatch::default();
        for ((cf, key), value) in &self.staged {
            let handle = self.cf(cf)?;
            match value {
                Some(bytes) => batch.put_cf(handle, key, bytes),
                None => batch.delete_cf(handle, key),
            }
        }
        self.db.write(batch)?;
        Ok(())
    }
}
