//! In-memory substitutes for the store, event bus and media storage.
//!
//! These exist so pipeline and assignment logic can be exercised end-to-end
//! without Postgres or a broker; they uphold the same contracts as the
//! production implementations.

mod events;
mod state_store;
mod storage;

pub use events::*;
pub use state_store::*;
pub use storage::*;
