pub mod error;
pub mod face_db;

pub use error::StoreError;
pub use face_db::{FaceDb, Manifest};
