use crate::domain::ports::{ClockBox, MarketStoreBox, UnitOfWorkBox};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// The entry point for every marketplace operation.
///
/// `Marketplace` owns the storage backend and the clock. Operations live in
/// the sibling modules (`orders`, `rentals`, `messaging`, `catalog`); each
/// one takes the caller explicitly, runs inside a single unit of work, and
/// either commits all of its writes or none.
pub struct Marketplace {
    store: MarketStoreBox,
    clock: ClockBox,
}

impl Marketplace {
    /// Creates a new `Marketplace`.
    ///
    /// # Arguments
    ///
    /// * `store` - Backend for every entity.
    /// * `clock` - Source of "now" for timestamps and rental accrual.
    pub fn new(store: MarketStoreBox, clock: ClockBox) -> Self {
        Self { store, clock }
    }

    pub(crate) async fn begin(&self) -> Result<UnitOfWorkBox> {
        self.store.begin().await
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
