//! psyconnect-core – Gemeinsame Identifikationstypen
//!
//! Dieses Crate stellt die IDs bereit, die von Protokoll- und
//! Signaling-Crate gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{ConnectionId, RoomId, UserIdentity};
