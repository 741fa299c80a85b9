//! Raum-Mitgliedschaften – welche Verbindung ist in welchem Raum
//!
//! Raeume werden beim ersten Beitritt angelegt und verschwinden, sobald das
//! letzte Mitglied gegangen ist. Eine Verbindung kann beliebig vielen
//! Raeumen gleichzeitig angehoeren.
//!
//! Beide Richtungen (Raum -> Verbindungen, Verbindung -> Raeume) werden
//! gepflegt, damit `bereinigen` beim Trennen nicht alle Raeume durchsuchen muss.

use psyconnect_core::{ConnectionId, RoomId};
use std::collections::{HashMap, HashSet};

/// Raum-Mitgliedschaften aller Verbindungen
#[derive(Debug, Default)]
pub struct RoomMembership {
    /// Raum -> Mitglieder
    raeume: HashMap<RoomId, HashSet<ConnectionId>>,
    /// Verbindung -> beigetretene Raeume
    mitgliedschaften: HashMap<ConnectionId, HashSet<RoomId>>,
}

impl RoomMembership {
    /// Erstellt eine leere Mitgliederverwaltung
    pub fn neu() -> Self {
        Self::default()
    }

    /// Fuegt eine Verbindung einem Raum hinzu
    ///
    /// Gibt `false` zurueck wenn die Verbindung bereits Mitglied war.
    pub fn beitreten(&mut self, verbindung: ConnectionId, raum: RoomId) -> bool {
        let neu = self
            .raeume
            .entry(raum.clone())
            .or_default()
            .insert(verbindung);
        if neu {
            self.mitgliedschaften
                .entry(verbindung)
                .or_default()
                .insert(raum);
        }
        neu
    }

    /// Entfernt eine Verbindung aus einem Raum
    ///
    /// Gibt `false` zurueck wenn die Verbindung kein Mitglied war.
    pub fn verlassen(&mut self, verbindung: ConnectionId, raum: &RoomId) -> bool {
        let entfernt = self.aus_raum_entfernen_intern(verbindung, raum);
        if entfernt {
            if let Some(raeume) = self.mitgliedschaften.get_mut(&verbindung) {
                raeume.remove(raum);
                if raeume.is_empty() {
                    self.mitgliedschaften.remove(&verbindung);
                }
            }
        }
        entfernt
    }

    /// Alle Mitglieder eines Raums
    pub fn mitglieder(&self, raum: &RoomId) -> Vec<ConnectionId> {
        self.raeume
            .get(raum)
            .map(|mitglieder| mitglieder.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Alle Mitglieder eines Raums ausser einer Verbindung
    pub fn mitglieder_ausser(&self, raum: &RoomId, ausgeschlossen: ConnectionId) -> Vec<ConnectionId> {
        self.raeume
            .get(raum)
            .map(|mitglieder| {
                mitglieder
                    .iter()
                    .copied()
                    .filter(|id| *id != ausgeschlossen)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entfernt eine Verbindung aus allen Raeumen
    ///
    /// Gibt die verlassenen Raeume zurueck.
    pub fn bereinigen(&mut self, verbindung: ConnectionId) -> Vec<RoomId> {
        let raeume: Vec<RoomId> = self
            .mitgliedschaften
            .remove(&verbindung)
            .map(|raeume| raeume.into_iter().collect())
            .unwrap_or_default();

        for raum in &raeume {
            self.aus_raum_entfernen_intern(verbindung, raum);
        }
        raeume
    }

    /// Raeume, denen eine Verbindung aktuell angehoert
    pub fn raeume_von(&self, verbindung: ConnectionId) -> HashSet<RoomId> {
        self.mitgliedschaften
            .get(&verbindung)
            .cloned()
            .unwrap_or_default()
    }

    /// Prueft ob eine Verbindung Mitglied eines Raums ist
    pub fn ist_mitglied(&self, verbindung: ConnectionId, raum: &RoomId) -> bool {
        self.raeume
            .get(raum)
            .is_some_and(|mitglieder| mitglieder.contains(&verbindung))
    }

    /// Anzahl Raeume mit mindestens einem Mitglied
    pub fn raum_anzahl(&self) -> usize {
        self.raeume.len()
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    /// Entfernt nur die Raum -> Verbindung Richtung, leere Raeume werden geloescht
    fn aus_raum_entfernen_intern(&mut self, verbindung: ConnectionId, raum: &RoomId) -> bool {
        let Some(mitglieder) = self.raeume.get_mut(raum) else {
            return false;
        };
        let entfernt = mitglieder.remove(&verbindung);
        if mitglieder.is_empty() {
            self.raeume.remove(raum);
        }
        entfernt
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
