mod events;
mod faces;
mod status;

pub use events::*;
pub use faces::*;
pub use status::*;
