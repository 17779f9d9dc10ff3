pub mod embedding;
pub mod errors;
pub mod events;
pub mod ids;
pub mod sample;

pub use embedding::{cosine_similarity, Embedding};
pub use errors::EnrollError;
pub use events::{SessionEvent, StatusUpdate};
pub use ids::SessionId;
pub use sample::{EnrollmentSession, FaceSample, ImageData, ImageFormat};
