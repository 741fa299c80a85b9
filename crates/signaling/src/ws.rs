//! HTTP-Einstieg des Relays: `GET /ws`

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::Response,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tokio::sync::watch;

use crate::connection::ClientConnection;
use crate::lifecycle::Relay;

/// Zustand fuer den WebSocket-Router
#[derive(Clone)]
pub struct RelayHttpState {
    pub relay: Relay,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Erstellt den Router mit dem WebSocket-Endpunkt
pub fn ws_router(state: RelayHttpState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// GET /ws – Upgrade und Start des Verbindungs-Tasks
async fn ws_upgrade(
    State(state): State<RelayHttpState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    ws: WebSocketUpgrade,
) -> Response {
    let peer_addr = connect_info.map(|ConnectInfo(addr)| addr);
    let verbindung = ClientConnection::neu(state.relay, peer_addr);
    let shutdown_rx = state.shutdown_rx;
    ws.on_upgrade(move |socket| verbindung.verarbeiten(socket, shutdown_rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use axum::{body::Body, http::Request};
    use psyconnect_observability::PsyConnectMetrics;
    use tower::ServiceExt;

    #[tokio::test]
    async fn ohne_upgrade_header_kein_websocket() {
        let relay = Relay::neu(RelayConfig::default(), PsyConnectMetrics::neu().unwrap());
        let (_tx, shutdown_rx) = watch::channel(false);
        let app = ws_router(RelayHttpState {
            relay: relay.clone(),
            shutdown_rx,
        });

        let antwort = app
            .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(antwort.status().is_client_error());
        assert_eq!(relay.verbindungs_anzahl(), 0);
    }
}
