//! PsyConnect Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use psyconnect_observability::logging_initialisieren;
use psyconnect_server::{config::ServerConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("PSYCONNECT_CONFIG").unwrap_or_else(|_| "config.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let mut config = ServerConfig::laden(&config_pfad)?;
    config.port_aus_env_anwenden(std::env::var("PORT").ok());

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        port = config.netzwerk.port,
        "PsyConnect Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
