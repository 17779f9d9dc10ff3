//! Face detection seam. The real model runs out of process (or behind an
//! FFI boundary); the engine only sees this trait.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use visage_core::{Embedding, EnrollError, ImageData};

/// One detected face in a frame: its embedding, the bounding box it was
/// found at (x1, y1, x2, y2), and the pre-cropped face region. Cropping
/// happens detector-side because the engine never decodes pixels.
#[derive(Clone, Debug)]
pub struct Detection {
    pub embedding: Embedding,
    pub bbox: (i32, i32, i32, i32),
    pub crop: ImageData,
}

/// Detects faces in an encoded frame. May return an empty list; that is
/// "no face visible", not an error.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, frame: &ImageData) -> Result<Vec<Detection>, EnrollError>;

    /// Output embedding dimensionality.
    fn dimensions(&self) -> usize;
}

/// Detector that never sees a face. Lets the server run end to end when
/// no model backend is wired in.
pub struct NullDetector {
    dims: usize,
}

impl NullDetector {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl FaceDetector for NullDetector {
    async fn detect(&self, _frame: &ImageData) -> Result<Vec<Detection>, EnrollError> {
        Ok(Vec::new())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Scripted result for one frame handed to [`MockDetector`].
pub enum MockFrame {
    Faces(Vec<Detection>),
    Empty,
    Failure(String),
}

/// Mock detector that replays scripted per-frame results in order, for
/// deterministic tests without a model. Once the script runs out it
/// reports every frame as empty.
pub struct MockDetector {
    dims: usize,
    script: Mutex<VecDeque<MockFrame>>,
}

impl MockDetector {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn scripted(dims: usize, frames: Vec<MockFrame>) -> Self {
        Self {
            dims,
            script: Mutex::new(frames.into()),
        }
    }

    pub fn push_frame(&self, frame: MockFrame) {
        self.script.lock().push_back(frame);
    }

    /// Convenience: a single-face detection with a fixed crop.
    pub fn face(embedding: Vec<f32>) -> Detection {
        Detection {
            embedding: Embedding::new(embedding),
            bbox: (10, 10, 110, 110),
            crop: ImageData::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        }
    }
}

#[async_trait]
impl FaceDetector for MockDetector {
    async fn detect(&self, _frame: &ImageData) -> Result<Vec<Detection>, EnrollError> {
        match self.script.lock().pop_front() {
            Some(MockFrame::Faces(faces)) => Ok(faces),
            Some(MockFrame::Empty) | None => Ok(Vec::new()),
            Some(MockFrame::Failure(reason)) => Err(EnrollError::DetectionFailure(reason)),
        }
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}
