//! Adapters between the marketplace and the outside world: JSON-lines
//! command replay in, CSV inventory report out.

pub mod csv;
pub mod jsonl;
