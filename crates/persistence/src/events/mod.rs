//! Event Sourcing module
//!
//! Ghi và đọc audit events từ JSONL files.

pub mod replay;
pub mod store;

pub use replay::{EventFilter, EventReader};
pub use store::EventStore;
