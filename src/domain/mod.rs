//! Marketplace entities, the rules that move them between states, and the
//! ports the application layer drives them through.

pub mod ids;
pub mod listing;
pub mod message;
pub mod money;
pub mod order;
pub mod ports;
pub mod product;
pub mod rental;
pub mod user;
