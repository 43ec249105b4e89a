pub mod analysis_result;
pub mod face_embedding;
pub mod person;
pub mod photo_person;

pub use analysis_result::*;
pub use face_embedding::*;
pub use person::*;
pub use photo_person::*;
