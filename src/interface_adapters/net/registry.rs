// Tracks admitted clients. Admission validates the requested name tag,
// then claims a seat under a single write lock so two racing connections
// cannot both take the last one or the same name.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::domain::prop::ClientId;

/// Longest accepted name tag, in characters.
pub const NAME_TAG_MAX_CHARS: usize = 16;

#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub name_tag: String,
    pub connected_at: Instant,
    pub last_seen: Instant,
}

/// Why an admission request was refused. `cause` strings go to the
/// client verbatim in the restricted `connRes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    EmptyName,
    NameTooLong,
    AlreadyRegistered,
    NameOccupied,
    ServerFull,
}

impl AdmissionError {
    pub fn cause(&self) -> &'static str {
        match self {
            AdmissionError::EmptyName => "name is empty",
            AdmissionError::NameTooLong => "name is longer than 16 characters",
            AdmissionError::AlreadyRegistered => "this connection is already registered",
            AdmissionError::NameOccupied => "name is already occupied",
            AdmissionError::ServerFull => "server is full",
        }
    }

    /// A registered client asking to register again keeps its socket;
    /// every other refusal closes the connection.
    pub fn closes_connection(&self) -> bool {
        !matches!(self, AdmissionError::AlreadyRegistered)
    }
}

pub struct ClientRegistry {
    max_players: usize,
    clients: RwLock<HashMap<ClientId, ClientRecord>>,
}

impl ClientRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            max_players,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Runs the admission checks in order and, on success, registers the
    /// client under a fresh id. Returns the id and the canonical
    /// (trimmed) name tag.
    pub async fn admit(
        &self,
        requested_name: &str,
        already_registered: bool,
    ) -> Result<(ClientId, String), AdmissionError> {
        let name_tag = requested_name.trim();
        if name_tag.is_empty() {
            return Err(AdmissionError::EmptyName);
        }
        if name_tag.chars().count() > NAME_TAG_MAX_CHARS {
            return Err(AdmissionError::NameTooLong);
        }
        if already_registered {
            return Err(AdmissionError::AlreadyRegistered);
        }

        let mut clients = self.clients.write().await;
        if clients.values().any(|record| record.name_tag == name_tag) {
            return Err(AdmissionError::NameOccupied);
        }
        if clients.len() >= self.max_players {
            return Err(AdmissionError::ServerFull);
        }

        let client_id = ClientId::new();
        let now = Instant::now();
        clients.insert(
            client_id,
            ClientRecord {
                name_tag: name_tag.to_string(),
                connected_at: now,
                last_seen: now,
            },
        );
        Ok((client_id, name_tag.to_string()))
    }

    pub async fn remove(&self, client_id: ClientId) -> Option<ClientRecord> {
        self.clients.write().await.remove(&client_id)
    }

    pub async fn touch(&self, client_id: ClientId) {
        if let Some(record) = self.clients.write().await.get_mut(&client_id) {
            record.last_seen = Instant::now();
        }
    }

    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }
}
