//! psyconnect-signaling – Verbindungsregister und Raum-Routing
//!
//! Dieser Crate implementiert den Relay-Kern von PsyConnect: welcher
//! Benutzer haengt an welcher Verbindung, welche Verbindung ist in welchem
//! Raum, und wer bekommt ein eingehendes Ereignis.
//!
//! ## Architektur
//!
//! ```text
//! GET /ws (ws_router)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Textframe -> Relay::frame_verarbeiten
//!     |  Send-Queue -> Socket
//!     v
//! Relay (Mutex<EventRouter> + Metriken)
//!     |
//!     v
//! EventRouter
//!     +-- Verbindungstabelle  (ConnectionId -> Verbindung)
//!     +-- ConnectionDirectory (Identitaet -> ConnectionId)
//!     +-- RoomMembership      (Raum <-> ConnectionId)
//!     |
//!     v
//! ClientSender::senden (try_send, nie blockierend)
//! ```

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod membership;
pub mod router;
pub mod session;
pub mod ws;

// Bequeme Re-Exporte
pub use broadcast::ClientSender;
pub use config::RelayConfig;
pub use connection::ClientConnection;
pub use directory::ConnectionDirectory;
pub use error::{SignalingError, SignalingResult};
pub use lifecycle::Relay;
pub use membership::RoomMembership;
pub use router::EventRouter;
pub use session::{Verbindung, VerbindungsZustand};
pub use ws::{ws_router, RelayHttpState};
