//! In-memory storage implementations.
//!
//! Used by tests and by local runs with `storage.type = memory`. State lives
//! for the life of the process only.

mod event_store;
mod position_store;
mod rollup_store;

pub use event_store::MemoryEventStore;
pub use position_store::MemoryPositionStore;
pub use rollup_store::MemoryRollupStore;
