//! Laufzeit-Konfiguration des Relays

use psyconnect_protocol::Schreibweise;
use std::time::Duration;

use crate::broadcast::SEND_QUEUE_GROESSE;

/// Einstellungen fuer Relay und Verbindungs-Tasks
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Kapazitaet der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Ping-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Wartezeit auf ein Pong nach dem Ping in Sekunden
    pub pong_timeout_sek: u64,
    /// Schreibweise der ausgehenden Chat-Echos
    pub schreibweise: Schreibweise,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            send_queue_groesse: SEND_QUEUE_GROESSE,
            keepalive_sek: 30,
            pong_timeout_sek: 10,
            schreibweise: Schreibweise::Kebab,
        }
    }
}

impl RelayConfig {
    pub fn keepalive_intervall(&self) -> Duration {
        Duration::from_secs(self.keepalive_sek.max(1))
    }

    /// Zeit ohne Lebenszeichen, nach der eine Verbindung als tot gilt
    pub fn timeout_dauer(&self) -> Duration {
        self.keepalive_intervall() + Duration::from_secs(self.pong_timeout_sek)
    }
}
