use serde::{Deserialize, Serialize};

use crate::sample::ImageData;

/// Events a connected client can drive a session with, independent of the
/// transport that delivered them. Connect/disconnect are lifecycle calls on
/// the controller rather than events, since they exist before/after the
/// session does.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A raw video frame arrived; run detection and accumulate faces.
    Frame { image: ImageData },
    /// Deduplicate the accumulated run and persist it under `label`.
    Save { label: String },
    /// Throw the accumulated run away and start over.
    Discard,
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Frame { .. } => "frame",
            Self::Save { .. } => "save",
            Self::Discard => "discard",
        }
    }
}

/// Status reported back to the session's own channel after each event.
/// `message()` renders the human-readable text the UI shows verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusUpdate {
    /// At least one face in the frame; `collected` is the run length
    /// before this frame's faces were appended.
    FaceDetected { collected: usize },
    /// No face visible in this frame.
    Searching,
    /// Save succeeded; `unique` samples were committed for `label`.
    Saved { label: String, unique: usize },
    /// The run was discarded on request.
    Discarded,
    /// Something went wrong handling the event; the session is intact.
    Error { message: String },
}

impl StatusUpdate {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Render the display text for the client. Wording matches what the
    /// enrollment page expects.
    pub fn message(&self) -> String {
        match self {
            Self::FaceDetected { collected } => {
                format!("Face Detected! ({collected} collected)")
            }
            Self::Searching => "Searching for face...".to_string(),
            Self::Saved { label, unique } => {
                format!("Success! Saved {unique} unique faces for {label}. Ready for new registration.")
            }
            Self::Discarded => "Session discarded. Ready for new registration.".to_string(),
            Self::Error { message } => format!("Error: {message}"),
        }
    }
}
