mod person_store;
mod state_store;

pub use person_store::*;
pub use state_store::*;
