// Wire protocol. Every frame is a JSON envelope of `type` plus `data`,
// with the variants below; anything else a client sends is a strike
// against it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::behaviour::{InputStatus, PatchSet};
use crate::domain::prop::{ClientId, PropSnapshot};
use crate::use_cases::types::DiffBatch;

/// Messages a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Admission request. The only message honored before registration.
    #[serde(rename = "conn")]
    Conn(ConnPayload),
    #[serde(rename = "clientAct")]
    ClientAct(ClientActPayload),
    #[serde(rename = "clientChat")]
    ClientChat(ClientChatPayload),
    /// Stage metadata query, answered outside the tick loop.
    #[serde(rename = "clientSceneMeta")]
    ClientSceneMeta(Option<serde_json::Value>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnPayload {
    pub client_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientActPayload {
    /// Self-reported identity. Ignored; the admitted identity of the
    /// transport wins.
    #[serde(rename = "clientID", default)]
    pub client_id: Option<String>,
    pub data: ClientActData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientActData {
    pub code: String,
    pub status: InputStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientChatPayload {
    pub message: String,
}

/// Messages the server sends. Arbitrary scene messages (sound cues and
/// the like) are serialized straight from their `{type, data}` parts and
/// bypass this enum.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "connRes")]
    ConnRes(ConnResDto),
    #[serde(rename = "scene")]
    Scene(SceneDiffDto),
    #[serde(rename = "serverChat")]
    ServerChat(ServerChatDto),
    #[serde(rename = "serverNotify")]
    ServerNotify(ServerNotifyDto),
    #[serde(rename = "serverSceneMeta")]
    ServerSceneMeta(SceneMetaDto),
    /// Reply to any non-`conn` message from an unregistered client.
    #[serde(rename = "notReg")]
    NotReg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnResStatus {
    Allowed,
    Restricted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnResDto {
    pub status: ConnResStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(rename = "clientID", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_tag: Option<String>,
}

impl ConnResDto {
    pub fn allowed(client_id: ClientId, name_tag: &str) -> Self {
        Self {
            status: ConnResStatus::Allowed,
            cause: None,
            client_id: Some(client_id.to_string()),
            name_tag: Some(name_tag.to_string()),
        }
    }

    pub fn restricted(cause: &str) -> Self {
        Self {
            status: ConnResStatus::Restricted,
            cause: Some(cause.to_string()),
            client_id: None,
            name_tag: None,
        }
    }
}

/// One tick's replication payload, keyed by prop id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneDiffDto {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub load: BTreeMap<String, PropSnapshot>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub update: BTreeMap<String, PatchSet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub anim: Vec<AnimDto>,
}

impl From<DiffBatch> for SceneDiffDto {
    fn from(batch: DiffBatch) -> Self {
        Self {
            load: batch.load,
            update: batch.update,
            delete: batch.delete,
            anim: batch
                .anim
                .into_iter()
                .map(|a| AnimDto {
                    id: a.id,
                    name: a.name,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnimDto {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerChatDto {
    pub sender: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerNotifyDto {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMetaDto {
    pub stage_system_name: String,
    pub grid_size: u32,
    pub curr_player_count: usize,
    pub max_player_count: usize,
}
