// Bridges scene output onto the shared broadcast channel. Frames are
// serialized once here; connection tasks only filter and forward bytes.

use axum::extract::ws::Utf8Bytes;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{error, trace};

use crate::interface_adapters::protocol::{ServerMessage, ServerNotifyDto};
use crate::use_cases::types::{SceneOutput, SceneSink, Target};

/// A serialized frame plus the audience it is meant for.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub target: Target,
    pub bytes: Utf8Bytes,
}

pub struct Communicator {
    outbound_tx: broadcast::Sender<OutboundFrame>,
}

impl Communicator {
    pub fn new(outbound_tx: broadcast::Sender<OutboundFrame>) -> Self {
        Self { outbound_tx }
    }

    fn publish(&self, target: Target, message: &ServerMessage) {
        match serialize_message(message) {
            Ok(bytes) => self.publish_raw(target, bytes),
            Err(err) => error!(error = %err, "failed to serialize outbound message"),
        }
    }

    fn publish_raw(&self, target: Target, bytes: Utf8Bytes) {
        trace!(?target, len = bytes.len(), "publishing frame");
        // Send only fails when no client is connected; frames for an
        // empty room are dropped on the floor.
        let _ = self.outbound_tx.send(OutboundFrame { target, bytes });
    }
}

impl SceneSink for Communicator {
    fn deliver(&mut self, output: SceneOutput) {
        match output {
            SceneOutput::Diff { target, batch } => {
                self.publish(target, &ServerMessage::Scene(batch.into()));
            }
            SceneOutput::Notification {
                target,
                message,
                kind,
            } => {
                self.publish(
                    target,
                    &ServerMessage::ServerNotify(ServerNotifyDto { message, kind }),
                );
            }
            SceneOutput::Arbitrary {
                target,
                kind,
                payload,
            } => {
                let envelope = json!({ "type": kind, "data": payload });
                match serde_json::to_string(&envelope) {
                    Ok(text) => self.publish_raw(target, Utf8Bytes::from(text)),
                    Err(err) => error!(error = %err, kind, "failed to serialize arbitrary frame"),
                }
            }
        }
    }
}

/// Serializes a server message into the text frame body sent on the wire.
pub fn serialize_message(message: &ServerMessage) -> Result<Utf8Bytes, serde_json::Error> {
    serde_json::to_string(message).map(Utf8Bytes::from)
}
