//! Prometheus-kompatible Metriken fuer PsyConnect
//!
//! Registrierte Metriken:
//! - `psyconnect_connected_clients` – Gauge: Aktuell verbundene Clients
//! - `psyconnect_rooms_active` – Gauge: Raeume mit mindestens einem Mitglied
//! - `psyconnect_events_total` – Counter: Eingehende Ereignisse (event)
//! - `psyconnect_deliveries_total` – Counter: Zugestellte ausgehende Ereignisse
//! - `psyconnect_dropped_events_total` – Counter: Verworfene Ereignisse (reason)
//! - `psyconnect_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `psyconnect_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle PsyConnect-Prometheus-Metriken
///
/// Clone teilt Registry und Zaehler.
#[derive(Clone)]
pub struct PsyConnectMetrics {
    pub registry: Arc<Registry>,

    // Relay-Metriken
    pub connected_clients: IntGauge,
    pub rooms_active: IntGauge,
    pub events_total: IntCounterVec,
    pub deliveries_total: IntCounter,
    pub dropped_events_total: IntCounterVec,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl PsyConnectMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Relay-Metriken ---
        let connected_clients = IntGauge::with_opts(Opts::new(
            "psyconnect_connected_clients",
            "Anzahl aktuell verbundener Clients",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let rooms_active = IntGauge::with_opts(Opts::new(
            "psyconnect_rooms_active",
            "Anzahl Raeume mit mindestens einem Mitglied",
        ))?;
        registry.register(Box::new(rooms_active.clone()))?;

        let events_total = IntCounterVec::new(
            Opts::new("psyconnect_events_total", "Eingehende Ereignisse nach Art"),
            &["event"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let deliveries_total = IntCounter::with_opts(Opts::new(
            "psyconnect_deliveries_total",
            "In Send-Queues eingereihte ausgehende Ereignisse",
        ))?;
        registry.register(Box::new(deliveries_total.clone()))?;

        let dropped_events_total = IntCounterVec::new(
            Opts::new(
                "psyconnect_dropped_events_total",
                "Still verworfene Ereignisse nach Grund",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(dropped_events_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("psyconnect_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "psyconnect_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            rooms_active,
            events_total,
            deliveries_total,
            dropped_events_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: PsyConnectMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<PsyConnectMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = PsyConnectMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn gauge_connected_clients_setzen() {
        let metriken = PsyConnectMetrics::neu().unwrap();
        metriken.connected_clients.set(42);
        assert_eq!(metriken.connected_clients.get(), 42);
    }

    #[test]
    fn drop_counter_mit_labels() {
        let metriken = PsyConnectMetrics::neu().unwrap();
        metriken
            .dropped_events_total
            .with_label_values(&["target_not_found"])
            .inc();
        let wert = metriken
            .dropped_events_total
            .with_label_values(&["target_not_found"])
            .get();
        assert_eq!(wert, 1);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = PsyConnectMetrics::neu().unwrap();
        metriken.connected_clients.set(5);
        metriken.deliveries_total.inc();
        metriken.events_total.with_label_values(&["auth"]).inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("psyconnect_connected_clients 5"));
        assert!(output.contains("psyconnect_deliveries_total 1"));
        assert!(output.contains("psyconnect_events_total{event=\"auth\"} 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn registries_sind_unabhaengig() {
        let a = PsyConnectMetrics::neu().unwrap();
        let b = PsyConnectMetrics::neu().unwrap();
        a.deliveries_total.inc();
        assert_eq!(b.deliveries_total.get(), 0);
    }
}
