//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use psyconnect_observability::{log_format_gueltig, log_level_gueltig};
use psyconnect_protocol::Schreibweise;
use psyconnect_signaling::RelayConfig;
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Relay-Einstellungen (Queues, Keepalive, Ereignisnamen)
    pub relay: RelayEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP und WebSocket
    pub bind_adresse: String,
    /// Port fuer HTTP und WebSocket
    pub port: u16,
    /// CORS-Origins (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 4000,
            cors_origins: vec![],
        }
    }
}

/// Relay-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Kapazitaet der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Ping-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Wartezeit auf ein Pong in Sekunden
    pub pong_timeout_sek: u64,
    /// Ausgehende Ereignisnamen: "kebab" oder "camel"
    pub ereignis_schreibweise: Schreibweise,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        let standard = RelayConfig::default();
        Self {
            send_queue_groesse: standard.send_queue_groesse,
            keepalive_sek: standard.keepalive_sek,
            pong_timeout_sek: standard.pong_timeout_sek,
            ereignis_schreibweise: standard.schreibweise,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level (trace, debug, info, warn, error)
    pub level: String,
    /// Format: "text" oder "json"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => toml::from_str::<Self>(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.validieren()?;
        Ok(config)
    }

    /// Uebernimmt den Port aus der `PORT`-Umgebungsvariable
    ///
    /// Ungueltige Werte werden mit einer Warnung ignoriert.
    pub fn port_aus_env_anwenden(&mut self, wert: Option<String>) {
        let Some(wert) = wert else {
            return;
        };
        match wert.trim().parse::<u16>() {
            Ok(port) => self.netzwerk.port = port,
            Err(_) => tracing::warn!(
                wert = %wert,
                port = self.netzwerk.port,
                "PORT ist keine gueltige Portnummer, verwende konfigurierten Port"
            ),
        }
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format '{}'", self.logging.format);
        }
        if self.relay.send_queue_groesse == 0 {
            anyhow::bail!("relay.send_queue_groesse muss groesser als 0 sein");
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Laufzeit-Konfiguration fuer den Relay
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            send_queue_groesse: self.relay.send_queue_groesse,
            keepalive_sek: self.relay.keepalive_sek,
            pong_timeout_sek: self.relay.pong_timeout_sek,
            schreibweise: self.relay.ereignis_schreibweise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert!(cfg.validieren().is_ok());
        assert_eq!(cfg.netzwerk.port, 4000);
        assert!(cfg.netzwerk.cors_origins.is_empty());
        assert_eq!(cfg.relay.send_queue_groesse, 64);
        assert_eq!(cfg.relay.ereignis_schreibweise, Schreibweise::Kebab);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_adresse(), "0.0.0.0:4000");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [netzwerk]
            port = 5000
            cors_origins = ["https://app.example"]

            [relay]
            ereignis_schreibweise = "camel"
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.netzwerk.port, 5000);
        assert_eq!(cfg.netzwerk.cors_origins, vec!["https://app.example"]);
        assert_eq!(cfg.relay.ereignis_schreibweise, Schreibweise::Camel);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
        assert_eq!(cfg.relay.keepalive_sek, 30);

        let relay = cfg.relay_config();
        assert_eq!(relay.schreibweise, Schreibweise::Camel);
        assert_eq!(relay.pong_timeout_sek, 10);
    }

    #[test]
    fn unbekannte_schreibweise_ist_fehler() {
        let toml = r#"
            [relay]
            ereignis_schreibweise = "snake"
        "#;
        assert!(toml::from_str::<ServerConfig>(toml).is_err());
    }

    #[test]
    fn port_aus_umgebung() {
        let mut cfg = ServerConfig::default();
        cfg.port_aus_env_anwenden(Some("8081".into()));
        assert_eq!(cfg.netzwerk.port, 8081);

        cfg.port_aus_env_anwenden(Some("kein-port".into()));
        assert_eq!(cfg.netzwerk.port, 8081);

        cfg.port_aus_env_anwenden(None);
        assert_eq!(cfg.netzwerk.port, 8081);
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        let mut cfg = ServerConfig::default();
        cfg.logging.level = "laut".into();
        assert!(cfg.validieren().is_err());

        let mut cfg = ServerConfig::default();
        cfg.relay.send_queue_groesse = 0;
        assert!(cfg.validieren().is_err());
    }

    #[test]
    fn fehlende_datei_ergibt_standardwerte() {
        let cfg = ServerConfig::laden("/nicht/vorhanden/psyconnect.toml").unwrap();
        assert_eq!(cfg.netzwerk.port, 4000);
    }
}
