//! psyconnect-server – Bibliotheks-Root
//!
//! Baut die HTTP-Anwendung (WebSocket-Relay, Health, Metriken) zusammen und
//! stellt den oeffentlichen Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use config::ServerConfig;
use psyconnect_observability::{
    health_router, metrics_router, request_timing_layer, timing_middleware, HealthState,
    PsyConnectMetrics,
};
use psyconnect_signaling::{ws_router, Relay, RelayHttpState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

/// Alles, was die HTTP-Anwendung braucht
pub struct AppTeile {
    pub app: Router,
    pub relay: Relay,
    pub health: HealthState,
}

/// Baut die komplette Axum-Anwendung
///
/// Routen: `/` (Liveness), `/health`, `/metrics`, `/ws`.
pub fn app_erstellen(
    config: &ServerConfig,
    metriken: PsyConnectMetrics,
    shutdown_rx: watch::Receiver<bool>,
) -> AppTeile {
    let relay = Relay::neu(config.relay_config(), metriken.clone());
    let health = HealthState::neu(Arc::new(relay.clone()));

    let app = Router::new()
        .merge(health_router(health.clone()))
        .merge(metrics_router(metriken.clone()))
        .merge(ws_router(RelayHttpState {
            relay: relay.clone(),
            shutdown_rx,
        }))
        .layer(axum::middleware::from_fn_with_state(
            metriken,
            timing_middleware,
        ))
        .layer(request_timing_layer())
        .layer(cors_layer(&config.netzwerk.cors_origins));

    AppTeile { app, relay, health }
}

/// CORS: ohne konfigurierte Origins permissiv, sonst nur diese
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let erlaubt: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(wert) => Some(wert),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ungueltiger CORS-Origin ignoriert");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(erlaubt)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet den Server und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Metriken registrieren
    /// 2. Anwendung bauen (Relay, Health, Metriken, WebSocket)
    /// 3. Listener binden
    /// 4. Bis Ctrl-C bedienen, dann Verbindungen schliessen
    pub async fn starten(self) -> Result<()> {
        let metriken = PsyConnectMetrics::neu()?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let AppTeile { app, relay, health } =
            app_erstellen(&self.config, metriken, shutdown_rx);

        let adresse = self.config.bind_adresse();
        let listener = tokio::net::TcpListener::bind(adresse.as_str()).await?;
        tracing::info!(
            adresse = %adresse,
            schreibweise = ?self.config.relay.ereignis_schreibweise,
            "PsyConnect Socket Server laeuft"
        );

        let herunterfahren = async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht installiert werden");
            }
            tracing::info!("Shutdown-Signal empfangen, Verbindungen werden geschlossen");
            health.herunterfahren_markieren();
            let _ = shutdown_tx.send(true);
        };

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(herunterfahren)
        .await?;

        tracing::info!(
            verbleibend = relay.verbindungs_anzahl(),
            "Server beendet"
        );
        Ok(())
    }
}
