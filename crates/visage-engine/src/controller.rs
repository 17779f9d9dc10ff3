//! Event orchestration for enrollment sessions.

use std::sync::Arc;

use tracing::instrument;

use visage_core::{FaceSample, ImageData, SessionEvent, SessionId, StatusUpdate};
use visage_store::FaceDb;

use crate::dedup::DedupEngine;
use crate::detector::FaceDetector;
use crate::sessions::SessionStore;

/// Engine tunables. The similarity threshold is the only real knob; it is
/// shared by every session.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Cosine-similarity cutoff above which two embeddings count as the
    /// same face.
    pub threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { threshold: 0.7 }
    }
}

/// Drives the per-session state machine: connect → collect frames →
/// save/discard → disconnect.
///
/// Every handler catches its own failures and converts them into a
/// [`StatusUpdate`] for the issuing session; nothing escapes to other
/// sessions or the process. A `None` return means the session id is not
/// registered (the event raced teardown) and there is nobody to notify.
pub struct EnrollmentController {
    sessions: SessionStore,
    dedup: DedupEngine,
    detector: Arc<dyn FaceDetector>,
    db: Arc<FaceDb>,
}

impl EnrollmentController {
    pub fn new(detector: Arc<dyn FaceDetector>, db: Arc<FaceDb>, config: EngineConfig) -> Self {
        Self {
            sessions: SessionStore::new(),
            dedup: DedupEngine::new(config.threshold),
            detector,
            db,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// A connection opened: register its session.
    pub fn connect(&self, id: &SessionId) {
        if self.sessions.create(id.clone()) {
            tracing::info!(session_id = %id, "Client connected");
        }
    }

    /// A connection closed: drop its session. Uncommitted samples are
    /// intentionally lost; there is no implicit save.
    pub fn disconnect(&self, id: &SessionId) {
        if self.sessions.remove(id) {
            tracing::info!(session_id = %id, "Client disconnected");
        }
    }

    /// Handle one event for one session, in arrival order.
    pub async fn handle(&self, id: &SessionId, event: SessionEvent) -> Option<StatusUpdate> {
        match event {
            SessionEvent::Frame { image } => self.handle_frame(id, image).await,
            SessionEvent::Save { label } => self.handle_save(id, &label),
            SessionEvent::Discard => self.handle_discard(id),
        }
    }

    /// Run detection on a frame and accumulate every detected face.
    /// Detection failures skip the frame and leave the run untouched.
    async fn handle_frame(&self, id: &SessionId, image: ImageData) -> Option<StatusUpdate> {
        // Reported count is the run length before this frame's faces are
        // appended, matching what the enrollment page displays.
        let collected = self.sessions.sample_count(id)?;

        let detections = match self.detector.detect(&image).await {
            Ok(detections) => detections,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Detection failed, frame skipped");
                return Some(StatusUpdate::error(e.to_string()));
            }
        };

        if detections.is_empty() {
            return Some(StatusUpdate::Searching);
        }

        for detection in detections {
            let sample = FaceSample::new(detection.embedding, detection.crop);
            // Session can disappear between events if the connection dies.
            self.sessions.append_sample(id, sample)?;
        }

        Some(StatusUpdate::FaceDetected { collected })
    }

    /// Deduplicate the run, persist it under `label`, then clear the run.
    /// On persistence failure the run is preserved so the user can retry.
    #[instrument(skip(self, id), fields(session_id = %id))]
    fn handle_save(&self, id: &SessionId, label: &str) -> Option<StatusUpdate> {
        if !self.sessions.contains(id) {
            return None;
        }

        if label.trim().is_empty() {
            return Some(StatusUpdate::error("Name cannot be empty."));
        }
        let label = label.trim();

        let samples = self.sessions.snapshot(id)?;
        let collected = samples.len();
        let unique = self.dedup.deduplicate(samples);

        match self.db.commit(label, &unique) {
            Ok(written) => {
                let _ = self.sessions.clear(id);
                tracing::info!(
                    session_id = %id,
                    label,
                    collected,
                    unique = written,
                    "Enrollment saved"
                );
                Some(StatusUpdate::Saved {
                    label: label.to_string(),
                    unique: written,
                })
            }
            Err(e) => {
                // Run is NOT cleared: the user can fix the problem and
                // save again without re-capturing.
                tracing::error!(session_id = %id, label, error = %e, "Save failed, samples kept");
                Some(StatusUpdate::error(format!("Could not save faces: {e}")))
            }
        }
    }

    /// Throw the run away without persisting anything.
    fn handle_discard(&self, id: &SessionId) -> Option<StatusUpdate> {
        if !self.sessions.clear(id) {
            return None;
        }
        tracing::info!(session_id = %id, "Session discarded");
        Some(StatusUpdate::Discarded)
    }
}
