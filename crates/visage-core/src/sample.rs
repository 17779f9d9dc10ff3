use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::ids::SessionId;

/// Encoding of a face-crop image as received from the client pipeline.
/// The core never decodes pixels; bytes pass through to storage untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// An encoded raster image (a cropped face region).
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub bytes: Bytes,
    pub format: ImageFormat,
}

impl ImageData {
    pub fn jpeg(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            format: ImageFormat::Jpeg,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One detected face: its embedding plus the crop it came from.
/// The crop carries no identity of its own; it is retained only so it can
/// be persisted alongside the embedding.
#[derive(Clone, Debug)]
pub struct FaceSample {
    pub embedding: Embedding,
    pub image: ImageData,
}

impl FaceSample {
    pub fn new(embedding: Embedding, image: ImageData) -> Self {
        Self { embedding, image }
    }
}

/// Per-connection enrollment state: an append-only run of samples between
/// connect and a save/discard decision. Exactly one exists per active
/// connection and it is never visible to any other connection.
#[derive(Debug)]
pub struct EnrollmentSession {
    pub id: SessionId,
    samples: Vec<FaceSample>,
}

impl EnrollmentSession {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            samples: Vec::new(),
        }
    }

    /// Append a sample in capture order. Duplicates are allowed here;
    /// dedup happens at save time.
    pub fn push(&mut self, sample: FaceSample) {
        self.samples.push(sample);
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[FaceSample] {
        &self.samples
    }

    /// Snapshot the current run for a save attempt. The session keeps its
    /// samples; callers clear explicitly once persistence has succeeded.
    pub fn snapshot(&self) -> Vec<FaceSample> {
        self.samples.clone()
    }

    /// Atomically replace the run with the empty sequence.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(v: &[f32]) -> FaceSample {
        FaceSample::new(
            Embedding::new(v.to_vec()),
            ImageData::jpeg(vec![0xFF, 0xD8, 0xFF]),
        )
    }

    #[test]
    fn session_appends_in_order() {
        let mut session = EnrollmentSession::new(SessionId::new());
        session.push(sample(&[1.0]));
        session.push(sample(&[2.0]));
        session.push(sample(&[3.0]));

        assert_eq!(session.sample_count(), 3);
        let dims: Vec<f32> = session
            .samples()
            .iter()
            .map(|s| s.embedding.as_slice()[0])
            .collect();
        assert_eq!(dims, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn snapshot_preserves_session_contents() {
        let mut session = EnrollmentSession::new(SessionId::new());
        session.push(sample(&[1.0]));

        let snap = session.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(session.sample_count(), 1, "snapshot must not drain");
    }

    #[test]
    fn clear_empties_without_destroying_session() {
        let mut session = EnrollmentSession::new(SessionId::new());
        session.push(sample(&[1.0]));
        session.clear();
        assert_eq!(session.sample_count(), 0);

        // Still usable for a fresh run.
        session.push(sample(&[2.0]));
        assert_eq!(session.sample_count(), 1);
    }

    #[test]
    fn image_format_extensions() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Png.extension(), "png");
    }
}
