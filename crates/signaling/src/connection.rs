//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede WebSocket-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Der Task liest Textframes, reicht sie an den [`Relay`] weiter
//! und schreibt die Send-Queue der Verbindung auf den Socket.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Jeder empfangene Frame (auch Pong) zaehlt als Lebenszeichen
//! - Ohne Lebenszeichen fuer `keepalive_sek + pong_timeout_sek` wird getrennt
//!
//! Egal wie die Schleife endet, am Ende steht immer [`Relay::trennen`].

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use psyconnect_core::ConnectionId;
use psyconnect_protocol::OutboundEvent;
use std::net::SocketAddr;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::lifecycle::Relay;

/// Grund fuer das Ende einer Verbindung (nur fuer das Log)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrennGrund {
    /// Client hat geschlossen oder der Stream ist zu Ende
    ClientGeschlossen,
    /// Lese- oder Schreibfehler auf dem Socket
    SocketFehler,
    /// Kein Lebenszeichen innerhalb des Timeouts
    Timeout,
    /// Server faehrt herunter
    Shutdown,
}

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    relay: Relay,
    peer_addr: Option<SocketAddr>,
}

impl ClientConnection {
    pub fn neu(relay: Relay, peer_addr: Option<SocketAddr>) -> Self {
        Self { relay, peer_addr }
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let (id, mut sende_rx) = self.relay.verbinden();
        tracing::debug!(connection_id = %id, peer = ?self.peer_addr, "WebSocket geoeffnet");

        let grund = self.schleife(id, socket, &mut sende_rx, &mut shutdown_rx).await;

        self.relay.trennen(id);
        tracing::info!(connection_id = %id, grund = ?grund, "Verbindungs-Task beendet");
    }

    async fn schleife(
        &self,
        id: ConnectionId,
        socket: WebSocket,
        sende_rx: &mut mpsc::Receiver<OutboundEvent>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> TrennGrund {
        let config = self.relay.config();
        let keepalive_intervall = config.keepalive_intervall();
        let timeout_dauer = config.timeout_dauer();

        let (mut ws_tx, mut ws_rx) = socket.split();

        if *shutdown_rx.borrow() {
            return TrennGrund::Shutdown;
        }

        let mut letzter_empfang = Instant::now();
        let mut ping = tokio::time::interval_at(
            Instant::now() + keepalive_intervall,
            keepalive_intervall,
        );

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            letzter_empfang = Instant::now();
                            // Fehler sind bereits geloggt und gezaehlt
                            let _ = self.relay.frame_verarbeiten(id, &text);
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return TrennGrund::ClientGeschlossen;
                        }
                        Some(Ok(Message::Binary(_))) => {
                            letzter_empfang = Instant::now();
                            tracing::debug!(connection_id = %id, "Binaerframe ignoriert");
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                            // Pings beantwortet axum selbst
                            letzter_empfang = Instant::now();
                        }
                        Some(Err(e)) => {
                            tracing::debug!(connection_id = %id, fehler = %e, "WebSocket-Lesefehler");
                            return TrennGrund::SocketFehler;
                        }
                    }
                }

                // Ausgehendes Ereignis aus der Send-Queue
                Some(ausgehend) = sende_rx.recv() => {
                    let text = match ausgehend.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(connection_id = %id, fehler = %e, "Serialisierung fehlgeschlagen");
                            continue;
                        }
                    };
                    if let Err(e) = ws_tx.send(Message::Text(text)).await {
                        tracing::debug!(connection_id = %id, fehler = %e, "Senden fehlgeschlagen");
                        return TrennGrund::SocketFehler;
                    }
                }

                // Keepalive-Ping
                _ = ping.tick() => {
                    if letzter_empfang.elapsed() > timeout_dauer {
                        tracing::info!(connection_id = %id, "Verbindungs-Timeout");
                        return TrennGrund::Timeout;
                    }
                    if let Err(e) = ws_tx.send(Message::Ping(Vec::new())).await {
                        tracing::debug!(connection_id = %id, fehler = %e, "Ping-Senden fehlgeschlagen");
                        return TrennGrund::SocketFehler;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::debug!(connection_id = %id, "Shutdown-Signal – Verbindung wird geschlossen");
                        let _ = ws_tx.send(Message::Close(None)).await;
                        return TrennGrund::Shutdown;
                    }
                }
            }
        }
    }
}
