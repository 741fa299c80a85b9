//! Eingehende Ereignisse
//!
//! Uebersetzt einen [`Frame`] in ein typisiertes [`InboundEvent`].
//!
//! ## Ereignisnamen
//! Im Feld sind zwei Schreibweisen im Umlauf (`join-chat` und `joinChat`,
//! `send-message` und `sendMessage`). Beide werden als Aliase akzeptiert.
//!
//! ## Signaling-Ziel
//! `call-offer`, `call-answer` und `ice-candidate` werden bevorzugt ueber
//! den Raum (`chatId`) geroutet. Nur wenn kein Raum angegeben ist, wird das
//! Ziel ueber die Identitaet (`to`) aufgeloest.

use psyconnect_core::{RoomId, UserIdentity};
use serde_json::{Map, Value};

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::Frame;

/// Felder, die der Router verbraucht und nicht an Empfaenger weitergibt
const ROUTING_FELDER: [&str; 4] = ["to", "chatId", "chat_id", "fromUser"];

// ---------------------------------------------------------------------------
// Ereignisarten
// ---------------------------------------------------------------------------

/// Art eines WebRTC-Signaling-Ereignisses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalArt {
    /// SDP-Offer (`call-offer`)
    Angebot,
    /// SDP-Answer (`call-answer`)
    Antwort,
    /// ICE-Kandidat (`ice-candidate`)
    IceKandidat,
}

impl SignalArt {
    /// Wire-Name, identisch fuer ein- und ausgehende Richtung
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Angebot => "call-offer",
            Self::Antwort => "call-answer",
            Self::IceKandidat => "ice-candidate",
        }
    }
}

/// Art eines eingehenden Ereignisses, aufgeloest aus dem Wire-Namen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EreignisArt {
    Auth,
    ChatBeitreten,
    ChatVerlassen,
    NachrichtSenden,
    Signal(SignalArt),
}

impl EreignisArt {
    /// Loest einen Wire-Namen inklusive Aliasen auf
    pub fn aus_name(name: &str) -> Option<Self> {
        let art = match name {
            "auth" => Self::Auth,
            "join-chat" | "joinChat" => Self::ChatBeitreten,
            "leave-chat" | "leaveChat" => Self::ChatVerlassen,
            "send-message" | "sendMessage" => Self::NachrichtSenden,
            "call-offer" | "callOffer" => Self::Signal(SignalArt::Angebot),
            "call-answer" | "callAnswer" => Self::Signal(SignalArt::Antwort),
            "ice-candidate" | "iceCandidate" => Self::Signal(SignalArt::IceKandidat),
            _ => return None,
        };
        Some(art)
    }

    /// Kanonischer Name (fuer Logs und Metrik-Labels)
    pub fn kanonischer_name(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::ChatBeitreten => "join-chat",
            Self::ChatVerlassen => "leave-chat",
            Self::NachrichtSenden => "send-message",
            Self::Signal(art) => art.wire_name(),
        }
    }
}

// ---------------------------------------------------------------------------
// Typisierte Ereignisse
// ---------------------------------------------------------------------------

/// Ziel eines Signaling-Ereignisses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalZiel {
    /// Alle Raummitglieder ausser dem Absender
    Raum(RoomId),
    /// Genau die aktuelle Verbindung dieser Identitaet
    Benutzer(UserIdentity),
}

/// Signaling-Umschlag: Ziel, optionaler Absender-Claim, Nutzdaten
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvelope {
    pub art: SignalArt,
    pub ziel: SignalZiel,
    /// Vom Client mitgeschickter Absender (`fromUser`), nur Fallback
    pub from_user: Option<UserIdentity>,
    /// Nutzdaten ohne Routing-Felder (`sdp`, `offer`, `candidate`, ...)
    pub nutzdaten: Map<String, Value>,
}

/// Ein vollstaendig dekodiertes eingehendes Ereignis
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Auth { user_id: UserIdentity },
    ChatBeitreten { chat_id: RoomId },
    ChatVerlassen { chat_id: RoomId },
    /// `payload` ist die komplette eingehende Nutzlast, sie wird 1:1 verteilt
    NachrichtSenden { chat_id: RoomId, payload: Value },
    Signal(SignalEnvelope),
}

impl InboundEvent {
    /// Dekodiert einen Frame in ein typisiertes Ereignis
    pub fn aus_frame(frame: Frame) -> ProtocolResult<Self> {
        let art = EreignisArt::aus_name(&frame.event)
            .ok_or_else(|| ProtocolError::UnbekanntesEreignis(frame.event.clone()))?;
        let name = art.kanonischer_name();

        match art {
            EreignisArt::Auth => {
                let user_id = frame
                    .data
                    .get("userId")
                    .and_then(id_aus_wert)
                    .ok_or(ProtocolError::FehlendesFeld {
                        ereignis: name,
                        feld: "userId",
                    })?;
                Ok(Self::Auth {
                    user_id: UserIdentity::from(user_id),
                })
            }
            EreignisArt::ChatBeitreten => Ok(Self::ChatBeitreten {
                chat_id: raum_aus_nutzlast(&frame.data, name)?,
            }),
            EreignisArt::ChatVerlassen => Ok(Self::ChatVerlassen {
                chat_id: raum_aus_nutzlast(&frame.data, name)?,
            }),
            EreignisArt::NachrichtSenden => {
                let chat_id = match &frame.data {
                    Value::Object(felder) => raum_aus_objekt(felder),
                    _ => None,
                }
                .ok_or(ProtocolError::FehlendesFeld {
                    ereignis: name,
                    feld: "chatId",
                })?;
                Ok(Self::NachrichtSenden {
                    chat_id,
                    payload: frame.data,
                })
            }
            EreignisArt::Signal(signal_art) => {
                let Value::Object(felder) = frame.data else {
                    return Err(ProtocolError::FehlendesFeld {
                        ereignis: name,
                        feld: "chatId",
                    });
                };
                signal_aus_objekt(signal_art, felder).map(Self::Signal)
            }
        }
    }

    /// Dekodiert direkt aus einer Textnachricht
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Self::aus_frame(Frame::from_json(json)?)
    }

    /// Art des Ereignisses
    pub fn art(&self) -> EreignisArt {
        match self {
            Self::Auth { .. } => EreignisArt::Auth,
            Self::ChatBeitreten { .. } => EreignisArt::ChatBeitreten,
            Self::ChatVerlassen { .. } => EreignisArt::ChatVerlassen,
            Self::NachrichtSenden { .. } => EreignisArt::NachrichtSenden,
            Self::Signal(umschlag) => EreignisArt::Signal(umschlag.art),
        }
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Akzeptiert nicht-leere Strings und Ganzzahlen als ID
fn id_aus_wert(wert: &Value) -> Option<String> {
    match wert {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn raum_aus_objekt(felder: &Map<String, Value>) -> Option<RoomId> {
    felder
        .get("chatId")
        .or_else(|| felder.get("chat_id"))
        .and_then(id_aus_wert)
        .map(RoomId::from)
}

/// Join/Leave: nackte ID oder Objekt mit `chatId`/`chat_id`
fn raum_aus_nutzlast(data: &Value, ereignis: &'static str) -> ProtocolResult<RoomId> {
    let raum = match data {
        Value::Object(felder) => raum_aus_objekt(felder),
        andere => id_aus_wert(andere).map(RoomId::from),
    };
    raum.ok_or(ProtocolError::FehlendesFeld {
        ereignis,
        feld: "chatId",
    })
}

fn signal_aus_objekt(art: SignalArt, mut felder: Map<String, Value>) -> ProtocolResult<SignalEnvelope> {
    let ziel = if let Some(raum) = raum_aus_objekt(&felder) {
        SignalZiel::Raum(raum)
    } else if let Some(to) = felder.get("to").and_then(id_aus_wert) {
        SignalZiel::Benutzer(UserIdentity::from(to))
    } else {
        return Err(ProtocolError::FehlendesFeld {
            ereignis: art.wire_name(),
            feld: "chatId",
        });
    };

    let from_user = felder
        .get("fromUser")
        .and_then(id_aus_wert)
        .map(UserIdentity::from);

    for feld in ROUTING_FELDER {
        felder.remove(feld);
    }

    Ok(SignalEnvelope {
        art,
        ziel,
        from_user,
        nutzdaten: felder,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dekodieren(event: &str, data: Value) -> ProtocolResult<InboundEvent> {
        InboundEvent::aus_frame(Frame::new(event, data))
    }

    #[test]
    fn alias_tabelle() {
        assert_eq!(EreignisArt::aus_name("joinChat"), Some(EreignisArt::ChatBeitreten));
        assert_eq!(EreignisArt::aus_name("join-chat"), Some(EreignisArt::ChatBeitreten));
        assert_eq!(EreignisArt::aus_name("sendMessage"), Some(EreignisArt::NachrichtSenden));
        assert_eq!(
            EreignisArt::aus_name("ice-candidate"),
            Some(EreignisArt::Signal(SignalArt::IceKandidat))
        );
        assert_eq!(EreignisArt::aus_name("receive-message"), None);
    }

    #[test]
    fn auth_mit_string_und_zahl() {
        let ev = dekodieren("auth", json!({"userId": "u1"})).unwrap();
        assert_eq!(ev, InboundEvent::Auth { user_id: "u1".into() });

        let ev = dekodieren("auth", json!({"userId": 17})).unwrap();
        assert_eq!(ev, InboundEvent::Auth { user_id: "17".into() });
    }

    #[test]
    fn auth_ohne_user_id_ist_fehlerhaft() {
        for data in [json!({}), json!({"userId": ""}), json!({"userId": null}), Value::Null] {
            let err = dekodieren("auth", data).unwrap_err();
            assert!(matches!(err, ProtocolError::FehlendesFeld { feld: "userId", .. }));
        }
    }

    #[test]
    fn join_akzeptiert_nackte_id_und_objekt() {
        let erwartet = InboundEvent::ChatBeitreten { chat_id: "r1".into() };
        assert_eq!(dekodieren("joinChat", json!("r1")).unwrap(), erwartet);
        assert_eq!(dekodieren("join-chat", json!({"chatId": "r1"})).unwrap(), erwartet);
        assert_eq!(dekodieren("join-chat", json!({"chat_id": "r1"})).unwrap(), erwartet);

        let ev = dekodieren("joinChat", json!(42)).unwrap();
        assert_eq!(ev, InboundEvent::ChatBeitreten { chat_id: "42".into() });
    }

    #[test]
    fn leave_ohne_raum_ist_fehlerhaft() {
        assert!(dekodieren("leave-chat", json!({})).is_err());
        assert!(dekodieren("leave-chat", json!(true)).is_err());
    }

    #[test]
    fn send_message_behaelt_komplette_nutzlast() {
        let data = json!({"chat_id": "r1", "text": "hi", "meta": {"a": 1}});
        let ev = dekodieren("send-message", data.clone()).unwrap();
        assert_eq!(
            ev,
            InboundEvent::NachrichtSenden {
                chat_id: "r1".into(),
                payload: data
            }
        );
    }

    #[test]
    fn send_message_ohne_chat_id_ist_fehlerhaft() {
        assert!(dekodieren("sendMessage", json!({"text": "hi"})).is_err());
        assert!(dekodieren("sendMessage", json!("r1")).is_err());
    }

    #[test]
    fn signal_ueber_raum_entfernt_routing_felder() {
        let ev = dekodieren(
            "call-offer",
            json!({"chatId": "r1", "sdp": "X", "fromUser": "u9", "to": "u2"}),
        )
        .unwrap();
        let InboundEvent::Signal(umschlag) = ev else {
            panic!("Erwartet Signal");
        };
        assert_eq!(umschlag.art, SignalArt::Angebot);
        assert_eq!(umschlag.ziel, SignalZiel::Raum("r1".into()));
        assert_eq!(umschlag.from_user, Some("u9".into()));
        assert_eq!(Value::Object(umschlag.nutzdaten), json!({"sdp": "X"}));
    }

    #[test]
    fn signal_ueber_identitaet_ohne_raum() {
        let ev = dekodieren("ice-candidate", json!({"to": "u2", "candidate": {"c": 1}})).unwrap();
        let InboundEvent::Signal(umschlag) = ev else {
            panic!("Erwartet Signal");
        };
        assert_eq!(umschlag.ziel, SignalZiel::Benutzer("u2".into()));
        assert_eq!(umschlag.from_user, None);
        assert_eq!(Value::Object(umschlag.nutzdaten), json!({"candidate": {"c": 1}}));
    }

    #[test]
    fn signal_ohne_ziel_ist_fehlerhaft() {
        assert!(dekodieren("call-answer", json!({"sdp": "Y"})).is_err());
        assert!(dekodieren("call-answer", json!("r1")).is_err());
    }

    #[test]
    fn unbekanntes_ereignis() {
        let err = InboundEvent::from_json(r#"{"event":"typing","data":{}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnbekanntesEreignis(name) if name == "typing"));
    }

    #[test]
    fn art_entspricht_dekodiertem_ereignis() {
        let ev = InboundEvent::from_json(r#"["callAnswer",{"chatId":"r1","answer":"A"}]"#).unwrap();
        assert_eq!(ev.art(), EreignisArt::Signal(SignalArt::Antwort));
        assert_eq!(ev.art().kanonischer_name(), "call-answer");
    }
}
