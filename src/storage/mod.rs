// Storage module - PERSISTENCE
// Keeps the local network snapshot and account keys in sled

mod store;

pub use store::{MatchingStore, StorageStats, StoreError};
