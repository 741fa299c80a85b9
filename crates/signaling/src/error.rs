//! Fehlertypen fuer den Signaling-Service
//!
//! Kein Fehler dieses Moduls ist fatal. Routing-Fehler werden geloggt und
//! gezaehlt, der Client bekommt nie eine Antwort.

use psyconnect_core::ConnectionId;
use psyconnect_protocol::ProtocolError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Identitaet unbekannt oder Raum ohne (weitere) Mitglieder
    #[error("Ziel nicht gefunden: {0}")]
    ZielNichtGefunden(String),

    /// Frame oder Nutzlast fehlerhaft
    #[error("Ungueltiges Ereignis: {0}")]
    UngueltigesEreignis(#[from] ProtocolError),

    /// Ereignis von einer Verbindung, die nicht (mehr) registriert ist
    #[error("Verbindung unbekannt: {0}")]
    VerbindungUnbekannt(ConnectionId),
}

impl SignalingError {
    /// Erstellt einen Ziel-nicht-gefunden-Fehler
    pub fn ziel_nicht_gefunden(ziel: impl std::fmt::Display) -> Self {
        Self::ZielNichtGefunden(ziel.to_string())
    }

    /// Kurzer, stabiler Grund fuer Metrik-Labels
    pub fn grund(&self) -> &'static str {
        match self {
            Self::ZielNichtGefunden(_) => "target_not_found",
            Self::UngueltigesEreignis(_) => "malformed_event",
            Self::VerbindungUnbekannt(_) => "unknown_connection",
        }
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gruende_sind_stabil() {
        assert_eq!(
            SignalingError::ziel_nicht_gefunden("raum r1").grund(),
            "target_not_found"
        );
        let e: SignalingError = ProtocolError::UnbekanntesEreignis("x".into()).into();
        assert_eq!(e.grund(), "malformed_event");
    }

    #[test]
    fn anzeige() {
        let e = SignalingError::ziel_nicht_gefunden("benutzer u2");
        assert_eq!(e.to_string(), "Ziel nicht gefunden: benutzer u2");
    }
}
