pub mod controller;
pub mod dedup;
pub mod detector;
pub mod sessions;

pub use controller::{EngineConfig, EnrollmentController};
pub use dedup::DedupEngine;
pub use detector::{Detection, FaceDetector, MockDetector, MockFrame, NullDetector};
pub use sessions::SessionStore;
