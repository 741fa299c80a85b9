//! Event-Router – besitzt den gesamten Registry-Zustand
//!
//! Verbindungstabelle, Verzeichnis und Raum-Mitgliedschaften leben hier
//! zusammen. Der Router selbst ist nicht synchronisiert, der
//! [`Relay`](crate::lifecycle::Relay) haelt ihn hinter genau einem Mutex.
//! Ein Ereignis wird damit komplett (Mutation + Zustellung) verarbeitet,
//! bevor das naechste beginnt.
//!
//! ## Zustellregeln
//!
//! | Ereignis          | Empfaenger                                   |
//! |-------------------|----------------------------------------------|
//! | `send-message`    | alle Raummitglieder inkl. Absender           |
//! | Signal mit Raum   | alle Raummitglieder ausser Absender          |
//! | Signal mit `to`   | aktuelle Verbindung der Identitaet (nie der Absender) |
//!
//! Kein Empfaenger ergibt [`SignalingError::ZielNichtGefunden`]. Der
//! Aufrufer loggt das und verwirft es, der Client merkt nichts.

use psyconnect_core::{ConnectionId, RoomId, UserIdentity};
use psyconnect_protocol::{InboundEvent, OutboundEvent, Schreibweise, SignalEnvelope, SignalZiel};
use std::collections::{HashMap, HashSet};

use crate::broadcast::{an_alle_zustellen, ClientSender};
use crate::directory::ConnectionDirectory;
use crate::error::{SignalingError, SignalingResult};
use crate::membership::RoomMembership;
use crate::session::Verbindung;

/// Routing-Kern: Verbindungen, Verzeichnis, Raeume
#[derive(Debug)]
pub struct EventRouter {
    verbindungen: HashMap<ConnectionId, Verbindung>,
    verzeichnis: ConnectionDirectory,
    raeume: RoomMembership,
    schreibweise: Schreibweise,
}

impl EventRouter {
    pub fn neu(schreibweise: Schreibweise) -> Self {
        Self {
            verbindungen: HashMap::new(),
            verzeichnis: ConnectionDirectory::neu(),
            raeume: RoomMembership::neu(),
            schreibweise,
        }
    }

    // -----------------------------------------------------------------------
    // Lebenszyklus
    // -----------------------------------------------------------------------

    /// Nimmt eine frisch verbundene Verbindung auf
    pub fn verbindung_aufnehmen(&mut self, sender: ClientSender) -> ConnectionId {
        let verbindung = Verbindung::neu(sender);
        let id = verbindung.id;
        self.verbindungen.insert(id, verbindung);
        id
    }

    /// Entfernt eine Verbindung samt Verzeichnis-Eintraegen und Mitgliedschaften
    ///
    /// Idempotent. Gibt `None` zurueck wenn die Verbindung schon weg war.
    pub fn verbindung_entfernen(&mut self, id: ConnectionId) -> Option<Verbindung> {
        let identitaeten = self.verzeichnis.entfernen(id);
        let raeume = self.raeume.bereinigen(id);
        let verbindung = self.verbindungen.remove(&id);

        if verbindung.is_some() {
            tracing::debug!(
                connection_id = %id,
                identitaeten = identitaeten.len(),
                raeume = raeume.len(),
                "Verbindung bereinigt"
            );
        }
        verbindung
    }

    // -----------------------------------------------------------------------
    // Ereignisverarbeitung
    // -----------------------------------------------------------------------

    /// Verarbeitet ein Ereignis einer Verbindung
    ///
    /// Gibt die Anzahl eingereihter Zustellungen zurueck (0 fuer Auth, Join,
    /// Leave).
    pub fn verarbeiten(
        &mut self,
        absender: ConnectionId,
        ereignis: InboundEvent,
    ) -> SignalingResult<usize> {
        if !self.verbindungen.contains_key(&absender) {
            return Err(SignalingError::VerbindungUnbekannt(absender));
        }

        match ereignis {
            InboundEvent::Auth { user_id } => {
                self.authentifizieren(absender, user_id);
                Ok(0)
            }
            InboundEvent::ChatBeitreten { chat_id } => {
                let neu = self.raeume.beitreten(absender, chat_id.clone());
                tracing::debug!(connection_id = %absender, chat_id = %chat_id, neu, "Raum beigetreten");
                Ok(0)
            }
            InboundEvent::ChatVerlassen { chat_id } => {
                let war_mitglied = self.raeume.verlassen(absender, &chat_id);
                tracing::debug!(
                    connection_id = %absender,
                    chat_id = %chat_id,
                    war_mitglied,
                    "Raum verlassen"
                );
                Ok(0)
            }
            InboundEvent::NachrichtSenden { chat_id, payload } => {
                let nachricht = OutboundEvent::nachricht(payload, self.schreibweise);
                self.an_raum_zustellen(&chat_id, None, &nachricht)
            }
            InboundEvent::Signal(umschlag) => self.signal_routen(absender, umschlag),
        }
    }

    fn authentifizieren(&mut self, absender: ConnectionId, identitaet: UserIdentity) {
        if let Some(verdraengt) = self.verzeichnis.registrieren(identitaet.clone(), absender) {
            tracing::debug!(
                user_id = %identitaet,
                alt = %verdraengt,
                neu = %absender,
                "Identitaet auf neue Verbindung umgezogen"
            );
        }
        if let Some(verbindung) = self.verbindungen.get_mut(&absender) {
            let vorher = verbindung.authentifizieren(identitaet.clone());
            tracing::debug!(
                connection_id = %absender,
                user_id = %identitaet,
                vorher = ?vorher.as_ref().map(UserIdentity::as_str),
                "Authentifiziert"
            );
        }
    }

    fn signal_routen(
        &mut self,
        absender: ConnectionId,
        umschlag: SignalEnvelope,
    ) -> SignalingResult<usize> {
        // Absender: bestaetigte Identitaet, sonst der mitgeschickte Claim
        let von = self
            .verbindungen
            .get(&absender)
            .and_then(|v| v.identitaet().cloned())
            .or_else(|| umschlag.from_user.clone());
        let nachricht = OutboundEvent::signal(&umschlag, von.as_ref());

        match &umschlag.ziel {
            SignalZiel::Raum(raum) => self.an_raum_zustellen(raum, Some(absender), &nachricht),
            SignalZiel::Benutzer(identitaet) => {
                let ziel = self
                    .verzeichnis
                    .nachschlagen(identitaet)
                    .filter(|ziel| *ziel != absender)
                    .ok_or_else(|| {
                        SignalingError::ziel_nicht_gefunden(format!("benutzer {identitaet}"))
                    })?;
                self.zustellen([ziel], &nachricht, || format!("benutzer {identitaet}"))
            }
        }
    }

    fn an_raum_zustellen(
        &self,
        raum: &RoomId,
        ausser: Option<ConnectionId>,
        nachricht: &OutboundEvent,
    ) -> SignalingResult<usize> {
        let mitglieder = match ausser {
            Some(absender) => self.raeume.mitglieder_ausser(raum, absender),
            None => self.raeume.mitglieder(raum),
        };
        self.zustellen(mitglieder, nachricht, || format!("raum {raum}"))
    }

    /// Reiht die Nachricht bei allen Empfaengern ein
    fn zustellen(
        &self,
        empfaenger: impl IntoIterator<Item = ConnectionId>,
        nachricht: &OutboundEvent,
        ziel_beschreibung: impl FnOnce() -> String,
    ) -> SignalingResult<usize> {
        let sender: Vec<&ClientSender> = empfaenger
            .into_iter()
            .filter_map(|id| self.verbindungen.get(&id).map(|v| &v.sender))
            .collect();
        if sender.is_empty() {
            return Err(SignalingError::ziel_nicht_gefunden(ziel_beschreibung()));
        }
        Ok(an_alle_zustellen(sender, nachricht))
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn verbindungs_anzahl(&self) -> usize {
        self.verbindungen.len()
    }

    pub fn raum_anzahl(&self) -> usize {
        self.raeume.raum_anzahl()
    }

    pub fn nachschlagen(&self, identitaet: &UserIdentity) -> Option<ConnectionId> {
        self.verzeichnis.nachschlagen(identitaet)
    }

    pub fn raeume_von(&self, id: ConnectionId) -> HashSet<RoomId> {
        self.raeume.raeume_von(id)
    }

    pub fn mitglieder(&self, raum: &RoomId) -> Vec<ConnectionId> {
        self.raeume.mitglieder(raum)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
