//! convkv-memstore: an in-process convergent key-value store.
//!
//! Implements [`convkv_wire::Transport`] with map merging, sibling tracking,
//! generated keys, secondary indexes and time-series tables. Useful for tests
//! and local development.

pub mod clock;
pub mod map;
pub mod store;

pub use clock::Clock;
pub use map::apply_map;
pub use store::MemStore;
