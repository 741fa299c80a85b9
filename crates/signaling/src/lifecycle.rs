//! Lebenszyklus-Steuerung – Verbinden, Ereignisse, Trennen
//!
//! [`Relay`] ist der geteilte Einstiegspunkt fuer alle Verbindungs-Tasks.
//! Er haelt den [`EventRouter`] hinter einem einzigen Mutex und fuehrt die
//! Metriken nach. Clone teilt denselben inneren Zustand.
//!
//! Fehler beim Routing werden hier geloggt und gezaehlt und nicht an den
//! Client weitergereicht.

use parking_lot::Mutex;
use psyconnect_core::{ConnectionId, RoomId, UserIdentity};
use psyconnect_observability::{PsyConnectMetrics, StatusQuelle};
use psyconnect_protocol::{InboundEvent, OutboundEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::broadcast::ClientSender;
use crate::config::RelayConfig;
use crate::error::{SignalingError, SignalingResult};
use crate::router::EventRouter;

/// Geteilter Relay-Zustand
#[derive(Clone)]
pub struct Relay {
    router: Arc<Mutex<EventRouter>>,
    config: Arc<RelayConfig>,
    metriken: PsyConnectMetrics,
}

impl Relay {
    pub fn neu(config: RelayConfig, metriken: PsyConnectMetrics) -> Self {
        Self {
            router: Arc::new(Mutex::new(EventRouter::neu(config.schreibweise))),
            config: Arc::new(config),
            metriken,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn metriken(&self) -> &PsyConnectMetrics {
        &self.metriken
    }

    /// Legt eine neue Verbindung an
    ///
    /// Der Empfaenger liefert alle an diese Verbindung gerouteten Ereignisse.
    pub fn verbinden(&self) -> (ConnectionId, mpsc::Receiver<OutboundEvent>) {
        let (sender, rx) = ClientSender::neu(ConnectionId::new(), self.config.send_queue_groesse);
        let (id, anzahl) = {
            let mut router = self.router.lock();
            let id = router.verbindung_aufnehmen(sender);
            let anzahl = router.verbindungs_anzahl();
            self.metriken.connected_clients.set(anzahl as i64);
            (id, anzahl)
        };

        tracing::info!(connection_id = %id, verbindungen = anzahl, "Client verbunden");
        (id, rx)
    }

    /// Trennt eine Verbindung und raeumt Verzeichnis und Raeume auf
    ///
    /// Gilt fuer jeden Trennungsgrund gleich. Mehrfaches Trennen ist harmlos.
    pub fn trennen(&self, id: ConnectionId) {
        // Gauges nur unter dem Lock setzen
        let (entfernt, verbindungen) = {
            let mut router = self.router.lock();
            let entfernt = router.verbindung_entfernen(id);
            let verbindungen = router.verbindungs_anzahl();
            self.metriken.connected_clients.set(verbindungen as i64);
            self.metriken.rooms_active.set(router.raum_anzahl() as i64);
            (entfernt, verbindungen)
        };

        if let Some(verbindung) = entfernt {
            let dauer = chrono::Utc::now() - verbindung.verbunden_seit;
            tracing::info!(
                connection_id = %id,
                user_id = ?verbindung.identitaet().map(UserIdentity::as_str),
                dauer_sek = dauer.num_seconds(),
                verbindungen,
                "Client getrennt"
            );
        }
    }

    /// Verarbeitet eine rohe Textnachricht einer Verbindung
    pub fn frame_verarbeiten(&self, id: ConnectionId, text: &str) -> SignalingResult<usize> {
        match InboundEvent::from_json(text) {
            Ok(ereignis) => self.ereignis_verarbeiten(id, ereignis),
            Err(e) => {
                let fehler = SignalingError::from(e);
                self.verwerfen(id, &fehler);
                Err(fehler)
            }
        }
    }

    /// Verarbeitet ein dekodiertes Ereignis
    ///
    /// Gibt die Anzahl eingereihter Zustellungen zurueck.
    pub fn ereignis_verarbeiten(
        &self,
        id: ConnectionId,
        ereignis: InboundEvent,
    ) -> SignalingResult<usize> {
        let art = ereignis.art().kanonischer_name();
        self.metriken.events_total.with_label_values(&[art]).inc();

        let ergebnis = {
            let mut router = self.router.lock();
            let ergebnis = router.verarbeiten(id, ereignis);
            self.metriken.rooms_active.set(router.raum_anzahl() as i64);
            ergebnis
        };

        match ergebnis {
            Ok(zugestellt) => {
                self.metriken.deliveries_total.inc_by(zugestellt as u64);
                tracing::trace!(connection_id = %id, event = art, zugestellt, "Ereignis geroutet");
                Ok(zugestellt)
            }
            Err(fehler) => {
                self.verwerfen(id, &fehler);
                Err(fehler)
            }
        }
    }

    fn verwerfen(&self, id: ConnectionId, fehler: &SignalingError) {
        self.metriken
            .dropped_events_total
            .with_label_values(&[fehler.grund()])
            .inc();
        tracing::debug!(connection_id = %id, fehler = %fehler, "Ereignis verworfen");
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn verbindungs_anzahl(&self) -> usize {
        self.router.lock().verbindungs_anzahl()
    }

    pub fn raum_anzahl(&self) -> usize {
        self.router.lock().raum_anzahl()
    }

    /// Aktuelle Verbindung einer Identitaet
    pub fn nachschlagen(&self, identitaet: &UserIdentity) -> Option<ConnectionId> {
        self.router.lock().nachschlagen(identitaet)
    }

    pub fn raeume_von(&self, id: ConnectionId) -> HashSet<RoomId> {
        self.router.lock().raeume_von(id)
    }

    pub fn mitglieder(&self, raum: &RoomId) -> Vec<ConnectionId> {
        self.router.lock().mitglieder(raum)
    }
}

impl StatusQuelle for Relay {
    fn verbindungen(&self) -> usize {
        self.verbindungs_anzahl()
    }

    fn aktive_raeume(&self) -> usize {
        self.raum_anzahl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_relay() -> Relay {
        Relay::neu(RelayConfig::default(), PsyConnectMetrics::neu().unwrap())
    }

    #[tokio::test]
    async fn verbinden_und_trennen_fuehren_gauges_nach() {
        let relay = test_relay();
        let (a, _rx_a) = relay.verbinden();
        let (_b, _rx_b) = relay.verbinden();
        assert_eq!(relay.metriken().connected_clients.get(), 2);

        relay.frame_verarbeiten(a, r#"{"event":"join-chat","data":"r1"}"#).unwrap();
        assert_eq!(relay.metriken().rooms_active.get(), 1);

        relay.trennen(a);
        relay.trennen(a);
        assert_eq!(relay.metriken().connected_clients.get(), 1);
        assert_eq!(relay.metriken().rooms_active.get(), 0);
    }

    #[test]
    fn gauges_stimmen_nach_parallelem_verbinden_und_trennen() {
        let relay = test_relay();
        std::thread::scope(|s| {
            for t in 0..8 {
                let relay = relay.clone();
                s.spawn(move || {
                    for i in 0..50 {
                        let (id, _rx) = relay.verbinden();
                        let raum = format!("r{}", (t + i) % 3);
                        let frame = format!(r#"["join-chat", "{raum}"]"#);
                        relay.frame_verarbeiten(id, &frame).unwrap();
                        if i % 2 == 0 {
                            relay.trennen(id);
                        }
                    }
                });
            }
        });

        let m = relay.metriken();
        assert_eq!(m.connected_clients.get(), relay.verbindungs_anzahl() as i64);
        assert_eq!(m.connected_clients.get(), 8 * 25);
        assert_eq!(m.rooms_active.get(), relay.raum_anzahl() as i64);
    }

    #[tokio::test]
    async fn fehlerhafte_frames_werden_gezaehlt() {
        let relay = test_relay();
        let (a, mut rx_a) = relay.verbinden();

        assert!(relay.frame_verarbeiten(a, "kein json").is_err());
        assert!(relay.frame_verarbeiten(a, r#"["unbekannt", {}]"#).is_err());
        assert!(relay.frame_verarbeiten(a, r#"{"event":"auth","data":{}}"#).is_err());

        let verworfen = relay
            .metriken()
            .dropped_events_total
            .with_label_values(&["malformed_event"])
            .get();
        assert_eq!(verworfen, 3);
        assert!(rx_a.try_recv().is_err(), "Client bekommt keine Fehlerantwort");
    }

    #[tokio::test]
    async fn zustellungen_und_ereignisse_werden_gezaehlt() {
        let relay = test_relay();
        let (a, mut rx_a) = relay.verbinden();
        relay.frame_verarbeiten(a, r#"["joinChat", {"chatId": "r1"}]"#).unwrap();
        let n = relay
            .frame_verarbeiten(a, r#"["sendMessage", {"chatId": "r1", "text": "hi"}]"#)
            .unwrap();
        assert_eq!(n, 1);
        assert!(rx_a.try_recv().is_ok());

        let m = relay.metriken();
        assert_eq!(m.deliveries_total.get(), 1);
        assert_eq!(m.events_total.with_label_values(&["join-chat"]).get(), 1);
        assert_eq!(m.events_total.with_label_values(&["send-message"]).get(), 1);
    }

    #[tokio::test]
    async fn status_quelle_spiegelt_zustand() {
        let relay = test_relay();
        let (a, _rx) = relay.verbinden();
        relay.frame_verarbeiten(a, r#"["join-chat", "r1"]"#).unwrap();
        relay.frame_verarbeiten(a, r#"["join-chat", "r2"]"#).unwrap();

        let quelle: Arc<dyn StatusQuelle> = Arc::new(relay.clone());
        assert_eq!(quelle.verbindungen(), 1);
        assert_eq!(quelle.aktive_raeume(), 2);
    }
}
