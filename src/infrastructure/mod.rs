//! Adapters behind the domain ports: storage backends and clocks.

pub mod clock;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
