//! Liveness- und Health-Check-Endpunkte
//!
//! - `GET /`       – statischer Bestaetigungstext (Liveness)
//! - `GET /health` – JSON mit Status, Version, Uptime und Relay-Auslastung

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Antwort des Liveness-Endpunkts
pub const LIVENESS_TEXT: &str = "PsyConnect Socket Server is running.";

/// Liefert die Kennzahlen des Relays fuer den Health-Check
///
/// Wird vom Signaling-Crate implementiert, damit dieses Crate nicht vom
/// Relay abhaengt.
pub trait StatusQuelle: Send + Sync + 'static {
    /// Anzahl aktuell verbundener Clients
    fn verbindungen(&self) -> usize;
    /// Anzahl Raeume mit mindestens einem Mitglied
    fn aktive_raeume(&self) -> usize;
}

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Shutdown eingeleitet, keine neuen Verbindungen mehr annehmen
    Draining,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub connections: usize,
    pub active_rooms: usize,
    pub server_time: DateTime<Utc>,
}

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Arc<Instant>,
    herunterfahren: Arc<AtomicBool>,
    quelle: Arc<dyn StatusQuelle>,
}

impl HealthState {
    pub fn neu(quelle: Arc<dyn StatusQuelle>) -> Self {
        Self {
            start_time: Arc::new(Instant::now()),
            herunterfahren: Arc::new(AtomicBool::new(false)),
            quelle,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Markiert den Server als herunterfahrend (Health liefert dann 503)
    pub fn herunterfahren_markieren(&self) {
        self.herunterfahren.store(true, Ordering::Relaxed);
    }

    pub fn status(&self) -> HealthStatus {
        if self.herunterfahren.load(Ordering::Relaxed) {
            HealthStatus::Draining
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Axum-Router fuer `/` und `/health`
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(liveness_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /` – statischer Bestaetigungstext
async fn liveness_handler() -> &'static str {
    LIVENESS_TEXT
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let status = state.status();
    let http_status = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Draining => StatusCode::SERVICE_UNAVAILABLE,
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        connections: state.quelle.verbindungen(),
        active_rooms: state.quelle.aktive_raeume(),
        server_time: Utc::now(),
    };

    (http_status, Json(response))
}
