//! Gemeinsame Identifikationstypen fuer PsyConnect
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Verbindungen, Benutzern und Raeumen zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Verbindungs-ID
///
/// Wird beim Verbindungsaufbau vergeben und aendert sich danach nie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Vom Client behauptete Benutzer-Identitaet
///
/// Wird nicht gegen einen Credential-Store geprueft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(String);

impl UserIdentity {
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserIdentity {
    fn from(id: &str) -> Self {
        Self::neu(id)
    }
}

impl From<String> for UserIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raum-ID (Chat-ID)
///
/// Raeume haben keinen eigenen Lebenszyklus, sie existieren nur solange
/// sie Mitglieder haben.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::neu(id)
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
