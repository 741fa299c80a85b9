//! Fehlertypen fuer das Relay-Protokoll

use thiserror::Error;

/// Alle Gruende, aus denen ein eingehender Frame verworfen wird
///
/// Jede Variante entspricht einem fehlerhaften Ereignis. Der Relay
/// antwortet darauf nie, der Frame wird nur verworfen.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame ist kein gueltiges JSON
    #[error("Ungueltiges JSON: {0}")]
    UngueltigesJson(#[from] serde_json::Error),

    /// JSON ist gueltig, hat aber weder Objekt- noch Array-Form
    #[error("Ungueltiger Frame: {0}")]
    UngueltigerFrame(String),

    /// Ereignisname ist keinem bekannten Ereignis zugeordnet
    #[error("Unbekanntes Ereignis: {0}")]
    UnbekanntesEreignis(String),

    /// Pflichtfeld fehlt oder hat den falschen Typ
    #[error("Ereignis '{ereignis}': Feld '{feld}' fehlt oder ist ungueltig")]
    FehlendesFeld {
        ereignis: &'static str,
        feld: &'static str,
    },
}

/// Result-Typ fuer das Relay-Protokoll
pub type ProtocolResult<T> = Result<T, ProtocolError>;
