//! Trait abstractions for dependency injection and testability.
//!
//! This module provides trait-based abstractions for external dependencies,
//! enabling unit testing without a database, a shared key-value store, or
//! messaging infrastructure.

pub mod broadcast;
pub mod lock;
pub mod publisher;
pub mod store;
pub mod time;

// Re-export all traits for crate-internal use.
// The public API surface is controlled by lib.rs re-exports.
pub use broadcast::{AuctionBroadcaster, AuctionNotice};
pub use lock::LockStore;
pub use publisher::EventPublisher;
pub use store::{ChangeSet, MarketStore};
pub use time::TimeProvider;

// Re-export default implementations
pub use broadcast::LoggingBroadcaster;
pub use publisher::LoggingEventPublisher;
pub use time::SystemTimeProvider;
