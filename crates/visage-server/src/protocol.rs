//! JSON wire protocol for the enrollment WebSocket.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use visage_core::{ImageData, ImageFormat, SessionEvent, StatusUpdate};

/// Messages a client sends over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// A video frame, base64-encoded (bare or as a `data:` URL).
    Frame { image: String },
    /// Finish the run and persist it under this name.
    Save { name: String },
    /// Throw the run away.
    Discard,
}

/// Messages the server sends back, only ever to the originating session.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Status { message: String },
}

impl ServerMessage {
    pub fn status(update: &StatusUpdate) -> Self {
        Self::Status {
            message: update.message(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Status {
            message: format!("Error: {}", message.into()),
        }
    }

    pub fn to_json(&self) -> String {
        // The enum cannot fail to serialize; it is strings all the way down.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Translate a parsed client message into the engine's typed event.
/// Frame payload decoding happens here so the engine never sees base64.
pub fn into_event(message: ClientMessage) -> Result<SessionEvent, String> {
    match message {
        ClientMessage::Frame { image } => {
            let image = decode_frame_payload(&image)?;
            Ok(SessionEvent::Frame { image })
        }
        ClientMessage::Save { name } => Ok(SessionEvent::Save { label: name }),
        ClientMessage::Discard => Ok(SessionEvent::Discard),
    }
}

/// Decode a frame payload: either bare base64 or a browser-style data URL
/// (`data:image/jpeg;base64,<...>`).
pub fn decode_frame_payload(payload: &str) -> Result<ImageData, String> {
    let (format, b64) = match payload.split_once(',') {
        Some((header, rest)) if header.starts_with("data:") => {
            let format = if header.contains("image/png") {
                ImageFormat::Png
            } else {
                ImageFormat::Jpeg
            };
            (format, rest)
        }
        _ => (ImageFormat::Jpeg, payload),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| format!("invalid frame payload: {e}"))?;

    if bytes.is_empty() {
        return Err("empty frame payload".to_string());
    }

    Ok(ImageData {
        bytes: bytes.into(),
        format,
    })
}
