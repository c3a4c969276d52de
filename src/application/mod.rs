//! Application layer: the lifecycle operations of the marketplace.
//!
//! `Marketplace` (in `engine`) is the single entry point. Its operations are
//! split by concern across the sibling modules and share the access and stock
//! helpers. Every operation takes the caller explicitly and runs inside one
//! unit of work obtained from the storage port.

pub mod access;
pub mod catalog;
pub mod engine;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod messaging;
pub mod orders;
pub mod rentals;
pub mod stock;
