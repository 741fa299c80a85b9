//! Verbindungs-Datensatz und Zustandsmaschine
//!
//! ```text
//! Unauthentifiziert --auth--> Authentifiziert
//!                               |  ^
//!                               +--+ (erneutes auth)
//! ```
//!
//! Raum-Operationen sind in beiden Zustaenden erlaubt.

use chrono::{DateTime, Utc};
use psyconnect_core::{ConnectionId, UserIdentity};

use crate::broadcast::ClientSender;

/// Zustand einer Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerbindungsZustand {
    /// Verbunden, noch kein `auth`
    Unauthentifiziert,
    /// Mindestens ein `auth` empfangen
    Authentifiziert(UserIdentity),
}

/// Eine lebende Client-Verbindung
///
/// Gehoert exklusiv dem [`EventRouter`](crate::router::EventRouter).
/// Verzeichnis und Mitgliedschaften referenzieren sie nur ueber die ID.
#[derive(Debug, Clone)]
pub struct Verbindung {
    pub id: ConnectionId,
    pub sender: ClientSender,
    pub verbunden_seit: DateTime<Utc>,
    zustand: VerbindungsZustand,
}

impl Verbindung {
    /// Neue, noch nicht authentifizierte Verbindung
    pub fn neu(sender: ClientSender) -> Self {
        Self {
            id: sender.connection_id,
            sender,
            verbunden_seit: Utc::now(),
            zustand: VerbindungsZustand::Unauthentifiziert,
        }
    }

    /// Uebernimmt eine (neue) Identitaet
    ///
    /// Gibt die vorherige Identitaet zurueck, falls eine andere gesetzt war.
    pub fn authentifizieren(&mut self, identitaet: UserIdentity) -> Option<UserIdentity> {
        let vorher = std::mem::replace(
            &mut self.zustand,
            VerbindungsZustand::Authentifiziert(identitaet.clone()),
        );
        match vorher {
            VerbindungsZustand::Authentifiziert(alt) if alt != identitaet => Some(alt),
            _ => None,
        }
    }

    /// Zuletzt beanspruchte Identitaet, `None` vor dem ersten `auth`
    pub fn identitaet(&self) -> Option<&UserIdentity> {
        match &self.zustand {
            VerbindungsZustand::Authentifiziert(id) => Some(id),
            VerbindungsZustand::Unauthentifiziert => None,
        }
    }

    pub fn zustand(&self) -> &VerbindungsZustand {
        &self.zustand
    }

    pub fn ist_authentifiziert(&self) -> bool {
        matches!(self.zustand, VerbindungsZustand::Authentifiziert(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_verbindung() -> Verbindung {
        let (sender, _rx) = ClientSender::neu(ConnectionId::new(), 4);
        Verbindung::neu(sender)
    }

    #[test]
    fn startet_unauthentifiziert() {
        let v = test_verbindung();
        assert_eq!(v.zustand(), &VerbindungsZustand::Unauthentifiziert);
        assert!(v.identitaet().is_none());
        assert_eq!(v.id, v.sender.connection_id);
    }

    #[test]
    fn auth_wechselt_zustand() {
        let mut v = test_verbindung();
        assert_eq!(v.authentifizieren("u1".into()), None);
        assert!(v.ist_authentifiziert());
        assert_eq!(v.identitaet(), Some(&UserIdentity::from("u1")));
    }

    #[test]
    fn erneutes_auth_meldet_alte_identitaet() {
        let mut v = test_verbindung();
        v.authentifizieren("u1".into());
        assert_eq!(v.authentifizieren("u1".into()), None);
        assert_eq!(
            v.authentifizieren("u2".into()),
            Some(UserIdentity::from("u1"))
        );
        assert_eq!(v.identitaet(), Some(&UserIdentity::from("u2")));
    }
}
