use tokio::sync::{broadcast, mpsc};

use crate::interface_adapters::communicator::OutboundFrame;
use crate::interface_adapters::net::registry::ClientRegistry;
use crate::use_cases::stage::StageMeta;
use crate::use_cases::types::SceneCommand;

/// Shared handles every connection task needs: the scene's command
/// queue, the broadcast side of the outbound channel, and the registry.
pub struct AppState {
    pub command_tx: mpsc::Sender<SceneCommand>,
    pub outbound_tx: broadcast::Sender<OutboundFrame>,
    pub registry: ClientRegistry,
    pub stage_meta: StageMeta,
}
