//! Cart state and synchronization.
//!
//! [`CartStore`] holds the single shared cart value; [`CartEngine`]
//! orchestrates asynchronous cart operations against the backend using an
//! optimistic-then-reconcile protocol. The engine is the only writer; all
//! other components observe the store read-only.

pub mod engine;
pub mod store;

pub use engine::CartEngine;
pub use store::{CartItem, CartState, CartStatus, CartStore, ProductSnapshot};
