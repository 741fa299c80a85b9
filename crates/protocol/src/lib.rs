//! psyconnect-protocol – Relay-Protokoll-Definitionen
//!
//! Dieses Crate definiert das Wire-Format zwischen Client und Relay:
//! JSON-Frames in WebSocket-Textnachrichten, die Alias-Tabelle der
//! Ereignisnamen, typisierte eingehende Ereignisse und die ausgehenden
//! Ereignisse, die an Empfaenger verteilt werden.

pub mod error;
pub mod events;
pub mod frame;
pub mod outbound;

pub use error::{ProtocolError, ProtocolResult};
pub use events::{EreignisArt, InboundEvent, SignalArt, SignalEnvelope, SignalZiel};
pub use frame::Frame;
pub use outbound::{OutboundEvent, Schreibweise};
