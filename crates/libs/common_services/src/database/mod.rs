mod error;
mod pool;
pub mod stores;
pub mod tables;

pub use error::*;
pub use pool::*;
