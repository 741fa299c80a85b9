//! Send-Queues der verbundenen Clients
//!
//! Jede Verbindung besitzt eine begrenzte mpsc-Queue. Der Router reiht
//! ausgehende Ereignisse nicht-blockierend ein (`try_send`). Eine volle oder
//! geschlossene Queue verwirft nur die Nachricht fuer diesen einen Empfaenger.

use psyconnect_core::ConnectionId;
use psyconnect_protocol::OutboundEvent;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standardgroesse der Send-Queue pro Client
pub const SEND_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub connection_id: ConnectionId,
    tx: mpsc::Sender<OutboundEvent>,
}

impl ClientSender {
    /// Erstellt Sender und zugehoerige Empfangs-Queue
    ///
    /// Die `ClientConnection` liest aus der Queue und schreibt auf den Socket.
    pub fn neu(
        connection_id: ConnectionId,
        groesse: usize,
    ) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(groesse.max(1));
        (Self { connection_id, tx }, rx)
    }

    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: OutboundEvent) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %self.connection_id,
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    connection_id = %self.connection_id,
                    "Send-Queue geschlossen (Client getrennt)"
                );
                false
            }
        }
    }
}

/// Stellt ein Ereignis an alle Empfaenger zu
///
/// Gibt die Anzahl der erfolgreich eingereihten Nachrichten zurueck.
/// Fehler einzelner Empfaenger beeinflussen die anderen nicht.
pub fn an_alle_zustellen<'a>(
    empfaenger: impl IntoIterator<Item = &'a ClientSender>,
    nachricht: &OutboundEvent,
) -> usize {
    empfaenger
        .into_iter()
        .filter(|sender| sender.senden(nachricht.clone()))
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
