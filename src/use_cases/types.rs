// Commands entering the scene and outputs leaving it. The net layer maps
// wire messages onto these; the communicator turns outputs into frames.

use std::collections::BTreeMap;

use crate::domain::behaviour::{InputStatus, PatchSet};
use crate::domain::prop::{ClientId, PropSnapshot};

/// Who an output is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Client(ClientId),
}

/// Inbound scene work, queued by the connection layer and drained at the
/// top of each tick.
#[derive(Debug)]
pub enum SceneCommand {
    Connect {
        client_id: ClientId,
        name_tag: String,
    },
    Disconnect {
        client_id: ClientId,
    },
    Action {
        client_id: ClientId,
        code: String,
        status: InputStatus,
    },
    /// Asks for a fresh full snapshot, used after an outbound channel lag.
    Sync {
        client_id: ClientId,
    },
}

/// One tick's replication batch. Ids key the maps in their string form.
#[derive(Debug, Clone, Default)]
pub struct DiffBatch {
    pub load: BTreeMap<String, PropSnapshot>,
    pub update: BTreeMap<String, PatchSet>,
    pub delete: Vec<String>,
    pub anim: Vec<AnimTrigger>,
}

impl DiffBatch {
    pub fn is_empty(&self) -> bool {
        self.load.is_empty() && self.update.is_empty() && self.delete.is_empty() && self.anim.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AnimTrigger {
    pub id: String,
    pub name: String,
}

/// Everything the scene can hand to the communicator.
#[derive(Debug, Clone)]
pub enum SceneOutput {
    Diff {
        target: Target,
        batch: DiffBatch,
    },
    Notification {
        target: Target,
        message: String,
        kind: String,
    },
    /// Escape hatch for message kinds the scene does not model, sent
    /// verbatim as `{type, data}`.
    Arbitrary {
        target: Target,
        kind: String,
        payload: serde_json::Value,
    },
}

/// Where the scene's outputs go. The production implementation serializes
/// and broadcasts; tests collect.
pub trait SceneSink: Send {
    fn deliver(&mut self, output: SceneOutput);
}
