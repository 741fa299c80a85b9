//! Frame-Format (WebSocket-Textnachrichten)
//!
//! Eingehend werden zwei Formen akzeptiert:
//! - Objekt-Form: `{"event": "auth", "data": {"userId": "u1"}}`
//! - Array-Form (socket.io-Paketnutzlast): `["auth", {"userId": "u1"}]`
//!
//! Ausgehend wird immer die Objekt-Form verwendet.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};

/// Ein dekodierter Frame: Ereignisname plus unveraenderte Nutzlast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Rohe JSON-Form vor der Normalisierung
#[derive(Deserialize)]
#[serde(untagged)]
enum RohFrame {
    Objekt(Frame),
    Array(Vec<Value>),
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Dekodiert einen Frame aus einer Textnachricht
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        match serde_json::from_str::<RohFrame>(json)? {
            RohFrame::Objekt(frame) => Ok(frame),
            RohFrame::Array(teile) => {
                let mut teile = teile.into_iter();
                let event = match teile.next() {
                    Some(Value::String(name)) => name,
                    _ => {
                        return Err(ProtocolError::UngueltigerFrame(
                            "erstes Array-Element muss der Ereignisname sein".into(),
                        ))
                    }
                };
                // Weitere Argumente (socket.io-Acks o.ae.) werden ignoriert
                let data = teile.next().unwrap_or(Value::Null);
                Ok(Self { event, data })
            }
        }
    }

    /// Serialisiert den Frame in Objekt-Form
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
