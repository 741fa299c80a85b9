//! Verbindungsverzeichnis – Identitaet -> aktuelle Verbindung
//!
//! Pro Identitaet gibt es hoechstens eine Verbindung. Ein neuer `auth`-Claim
//! fuer dieselbe Identitaet ueberschreibt den alten Eintrag ohne Warnung.
//!
//! Entfernt wird nach Verbindung (nicht nach Identitaet): wurde eine
//! Identitaet inzwischen von einer neueren Verbindung uebernommen, bleibt
//! dieser Eintrag beim Trennen der alten Verbindung erhalten.
//!
//! Das Verzeichnis ist nicht selbst synchronisiert, es gehoert dem
//! [`EventRouter`](crate::router::EventRouter).

use psyconnect_core::{ConnectionId, UserIdentity};
use std::collections::HashMap;

/// Zuordnung Identitaet -> aktuelle Verbindung
#[derive(Debug, Default)]
pub struct ConnectionDirectory {
    eintraege: HashMap<UserIdentity, ConnectionId>,
}

impl ConnectionDirectory {
    /// Erstellt ein leeres Verzeichnis
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert (oder ueberschreibt) die Verbindung einer Identitaet
    ///
    /// Gibt die verdraengte Verbindung zurueck, falls eine andere Verbindung
    /// die Identitaet vorher belegt hatte.
    pub fn registrieren(
        &mut self,
        identitaet: UserIdentity,
        verbindung: ConnectionId,
    ) -> Option<ConnectionId> {
        self.eintraege
            .insert(identitaet, verbindung)
            .filter(|alt| *alt != verbindung)
    }

    /// Aktuelle Verbindung einer Identitaet, `None` wenn unbekannt
    pub fn nachschlagen(&self, identitaet: &UserIdentity) -> Option<ConnectionId> {
        self.eintraege.get(identitaet).copied()
    }

    /// Entfernt alle Eintraege, die auf diese Verbindung zeigen
    ///
    /// Gibt die entfernten Identitaeten zurueck.
    pub fn entfernen(&mut self, verbindung: ConnectionId) -> Vec<UserIdentity> {
        let mut entfernt = Vec::new();
        self.eintraege.retain(|identitaet, ziel| {
            if *ziel == verbindung {
                entfernt.push(identitaet.clone());
                false
            } else {
                true
            }
        });
        entfernt
    }

    /// Anzahl registrierter Identitaeten
    pub fn anzahl(&self) -> usize {
        self.eintraege.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registrieren_und_nachschlagen() {
        let mut dir = ConnectionDirectory::neu();
        let a = ConnectionId::new();

        assert_eq!(dir.registrieren("u1".into(), a), None);
        assert_eq!(dir.nachschlagen(&"u1".into()), Some(a));
        assert_eq!(dir.nachschlagen(&"u2".into()), None);
    }

    #[test]
    fn erneutes_registrieren_derselben_verbindung_ist_wirkungslos() {
        let mut dir = ConnectionDirectory::neu();
        let a = ConnectionId::new();

        dir.registrieren("u1".into(), a);
        assert_eq!(dir.registrieren("u1".into(), a), None);
        assert_eq!(dir.anzahl(), 1);
        assert_eq!(dir.nachschlagen(&"u1".into()), Some(a));
    }

    #[test]
    fn neuer_claim_ueberschreibt() {
        let mut dir = ConnectionDirectory::neu();
        let alt = ConnectionId::new();
        let neu = ConnectionId::new();

        dir.registrieren("u1".into(), alt);
        assert_eq!(dir.registrieren("u1".into(), neu), Some(alt));
        assert_eq!(dir.nachschlagen(&"u1".into()), Some(neu));
    }

    #[test]
    fn entfernen_nach_verbindung_schont_uebernommene_identitaet() {
        let mut dir = ConnectionDirectory::neu();
        let alt = ConnectionId::new();
        let neu = ConnectionId::new();

        dir.registrieren("u1".into(), alt);
        dir.registrieren("u1".into(), neu);

        // Alte Verbindung trennt sich: Eintrag zeigt schon auf die neue
        assert!(dir.entfernen(alt).is_empty());
        assert_eq!(dir.nachschlagen(&"u1".into()), Some(neu));

        assert_eq!(dir.entfernen(neu), vec![UserIdentity::from("u1")]);
        assert_eq!(dir.nachschlagen(&"u1".into()), None);
    }

    #[test]
    fn entfernen_raeumt_alle_identitaeten_der_verbindung() {
        let mut dir = ConnectionDirectory::neu();
        let a = ConnectionId::new();
        let b = ConnectionId::new();

        dir.registrieren("u1".into(), a);
        dir.registrieren("u2".into(), a);
        dir.registrieren("u3".into(), b);

        let mut entfernt = dir.entfernen(a);
        entfernt.sort();
        assert_eq!(entfernt, vec![UserIdentity::from("u1"), UserIdentity::from("u2")]);
        assert_eq!(dir.anzahl(), 1);
        assert_eq!(dir.nachschlagen(&"u3".into()), Some(b));
    }

    #[test]
    fn entfernen_unbekannter_verbindung_ist_noop() {
        let mut dir = ConnectionDirectory::neu();
        dir.registrieren("u1".into(), ConnectionId::new());
        assert!(dir.entfernen(ConnectionId::new()).is_empty());
        assert_eq!(dir.anzahl(), 1);
    }
}
