//! Ausgehende Ereignisse
//!
//! Ein [`OutboundEvent`] wird einmal pro Routing-Vorgang gebaut und an jeden
//! Empfaenger geklont.

use psyconnect_core::UserIdentity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::{SignalArt, SignalEnvelope};

/// Schreibweise der ausgehenden Ereignisnamen
///
/// Betrifft nur das Chat-Echo (`receive-message` vs. `receiveMessage`),
/// die Signaling-Namen sind in beiden Konventionen gleich.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schreibweise {
    #[default]
    Kebab,
    Camel,
}

/// Ereignis, das an eine Empfaenger-Verbindung geht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    pub event: String,
    pub data: Value,
}

impl OutboundEvent {
    /// Chat-Echo: die eingehende Nutzlast unveraendert an den Raum
    pub fn nachricht(payload: Value, schreibweise: Schreibweise) -> Self {
        let event = match schreibweise {
            Schreibweise::Kebab => "receive-message",
            Schreibweise::Camel => "receiveMessage",
        };
        Self {
            event: event.to_string(),
            data: payload,
        }
    }

    /// Signaling: Nutzdaten plus `from` mit der Absender-Identitaet
    ///
    /// Ohne bekannte Identitaet ist `from` gleich `null`.
    pub fn signal(umschlag: &SignalEnvelope, absender: Option<&UserIdentity>) -> Self {
        let mut data = umschlag.nutzdaten.clone();
        let from = absender
            .map(|id| Value::String(id.as_str().to_string()))
            .unwrap_or(Value::Null);
        data.insert("from".to_string(), from);
        Self {
            event: umschlag.art.wire_name().to_string(),
            data: Value::Object(data),
        }
    }

    /// Prueft ob das Ereignis ein Signaling-Ereignis der gegebenen Art ist
    pub fn ist_signal(&self, art: SignalArt) -> bool {
        self.event == art.wire_name()
    }

    /// Serialisiert in Objekt-Form (gleiche Form wie [`crate::Frame`])
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
