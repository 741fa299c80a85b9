//! Request-Timing Middleware fuer Axum
//!
//! Misst die Antwortzeit jeder HTTP-Anfrage und protokolliert sie als
//! strukturiertes Log-Event sowie als Prometheus-Histogramm.

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    middleware::Next,
};
use std::time::Instant;

use crate::metrics::PsyConnectMetrics;

/// Erstellt den Trace-Layer fuer alle HTTP-Anfragen
pub fn request_timing_layer() -> tower_http::trace::TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    use tower_http::trace::TraceLayer;
    TraceLayer::new_for_http()
}

/// Axum-Middleware-Funktion: misst Antwortzeit, loggt und zaehlt.
///
/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/", get(handler))
///     .layer(axum::middleware::from_fn_with_state(metriken, timing_middleware))
/// ```
pub async fn timing_middleware(
    State(metriken): State<PsyConnectMetrics>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let methode = req.method().to_string();
    let pfad = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer = start.elapsed();
    let status = response.status().as_u16();

    metriken
        .http_requests_total
        .with_label_values(&[&methode, &pfad, &status.to_string()])
        .inc();
    metriken
        .http_request_duration_seconds
        .with_label_values(&[&methode, &pfad])
        .observe(dauer.as_secs_f64());

    // WebSocket-Upgrades enden sofort mit 101, die Dauer der Verbindung
    // steht im Log der Verbindung selbst
    tracing::debug!(
        method = %methode,
        path = %pfad,
        status = status,
        duration_ms = dauer.as_millis(),
        "HTTP-Anfrage abgeschlossen"
    );

    response
}
