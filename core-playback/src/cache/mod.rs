//! # Persistent Cache Store
//!
//! Durable item copies in a host-provided cache bucket. Capacity management
//! belongs to the host; nothing here evicts on its own.

pub mod key;
pub mod store;

pub use key::CacheKeyScheme;
pub use store::PersistentCacheStore;
