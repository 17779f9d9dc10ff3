//! Per-connection WebSocket lifecycle. One connection is one enrollment
//! session: the session is created on upgrade and destroyed when either
//! half of the socket goes away.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use visage_core::SessionId;
use visage_engine::EnrollmentController;

use crate::protocol::{self, ClientMessage, ServerMessage};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

/// Drive one WebSocket connection to completion.
///
/// The reader runs all of this connection's events inline, so they are
/// handled strictly in arrival order; heavy frames only ever stall their
/// own session. The writer forwards status messages and keeps the
/// heartbeat going, closing the connection when the client has not
/// answered a ping within the timeout.
pub async fn handle_connection(
    socket: WebSocket,
    controller: Arc<EnrollmentController>,
    max_send_queue: usize,
) {
    let session_id = SessionId::new();
    controller.connect(&session_id);

    let (tx, mut rx) = mpsc::channel::<String>(max_send_queue);
    let (mut ws_tx, mut ws_rx) = socket.split();
    let last_pong = Arc::new(AtomicU64::new(now_secs()));

    let writer_pong = Arc::clone(&last_pong);
    let writer_sid = session_id.clone();
    let writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping.tick() => {
                    let silent = now_secs().saturating_sub(writer_pong.load(Ordering::Relaxed));
                    if silent > CLIENT_TIMEOUT.as_secs() {
                        tracing::info!(session_id = %writer_sid, silent_secs = silent, "Client timed out");
                        break;
                    }
                    if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let reader_controller = Arc::clone(&controller);
    let reader_sid = session_id.clone();
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    let reply =
                        process_text(&reader_controller, &reader_sid, text.as_str()).await;
                    if let Some(reply) = reply {
                        if tx.send(reply.to_json()).await.is_err() {
                            break;
                        }
                    }
                }
                WsMessage::Pong(_) => {
                    last_pong.store(now_secs(), Ordering::Relaxed);
                }
                WsMessage::Close(_) => break,
                WsMessage::Ping(_) => {} // axum answers pongs itself
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }

    controller.disconnect(&session_id);
}

/// Handle one text message: parse, translate, run through the controller,
/// and produce the status reply (if the session still exists).
/// Malformed input never tears the connection down.
pub async fn process_text(
    controller: &EnrollmentController,
    session_id: &SessionId,
    text: &str,
) -> Option<ServerMessage> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(_) => {
            tracing::debug!(session_id = %session_id, "Unparseable client message");
            return Some(ServerMessage::error("unrecognized message"));
        }
    };

    let event = match protocol::into_event(message) {
        Ok(event) => event,
        Err(reason) => return Some(ServerMessage::error(reason)),
    };

    controller
        .handle(session_id, event)
        .await
        .map(|status| ServerMessage::status(&status))
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use visage_engine::{EngineConfig, MockDetector, MockFrame};
    use visage_store::FaceDb;

    fn controller(detector: MockDetector) -> (tempfile::TempDir, Arc<EnrollmentController>) {
        let tmp = tempfile::tempdir().unwrap();
        let db = Arc::new(FaceDb::open(tmp.path().join("db")).unwrap());
        let controller = Arc::new(EnrollmentController::new(
            Arc::new(detector),
            db,
            EngineConfig::default(),
        ));
        (tmp, controller)
    }

    fn frame_json() -> String {
        let b64 = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
        format!(r#"{{"type":"frame","image":"data:image/jpeg;base64,{b64}"}}"#)
    }

    fn message_of(reply: ServerMessage) -> String {
        let ServerMessage::Status { message } = reply;
        message
    }

    #[tokio::test]
    async fn frame_save_roundtrip_over_protocol() {
        let (_tmp, controller) = controller(MockDetector::scripted(
            2,
            vec![MockFrame::Faces(vec![MockDetector::face(vec![1.0, 0.0])])],
        ));
        let id = SessionId::new();
        controller.connect(&id);

        let reply = process_text(&controller, &id, &frame_json()).await.unwrap();
        assert_eq!(message_of(reply), "Face Detected! (0 collected)");

        let reply = process_text(&controller, &id, r#"{"type":"save","name":"alice"}"#)
            .await
            .unwrap();
        assert_eq!(
            message_of(reply),
            "Success! Saved 1 unique faces for alice. Ready for new registration."
        );
    }

    #[tokio::test]
    async fn bad_json_gets_error_status_not_disconnect() {
        let (_tmp, controller) = controller(MockDetector::new(2));
        let id = SessionId::new();
        controller.connect(&id);

        let reply = process_text(&controller, &id, "{not json").await.unwrap();
        assert_eq!(message_of(reply), "Error: unrecognized message");

        // Connection state is untouched; the session still works.
        let reply = process_text(&controller, &id, r#"{"type":"discard"}"#).await.unwrap();
        assert_eq!(message_of(reply), "Session discarded. Ready for new registration.");
    }

    #[tokio::test]
    async fn invalid_frame_payload_gets_error_status() {
        let (_tmp, controller) = controller(MockDetector::new(2));
        let id = SessionId::new();
        controller.connect(&id);

        let reply = process_text(
            &controller,
            &id,
            r#"{"type":"frame","image":"data:image/jpeg;base64,@@@"}"#,
        )
        .await
        .unwrap();
        assert!(message_of(reply).starts_with("Error: invalid frame payload"));
    }

    #[tokio::test]
    async fn unknown_session_produces_no_reply() {
        let (_tmp, controller) = controller(MockDetector::new(2));
        let ghost = SessionId::new();

        let reply = process_text(&controller, &ghost, r#"{"type":"discard"}"#).await;
        assert!(reply.is_none());
    }
}
