//! Server configuration structures and environment parsing.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::ConfigError;

/// Runtime configuration for all transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port for the HTTP REST convenience API.
    pub http_port: u16,
    /// Port for the streamable HTTP transport.
    pub streamable_port: u16,
    /// Port for the WebSocket transport.
    pub websocket_port: u16,
    /// Timeout for graceful shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
    /// Whether to enforce the Origin check on browser-facing transports.
    pub enable_origin_check: bool,
    /// Origin allow-list; `*` matches any host.
    pub allowed_origins: Vec<String>,
    /// Default log level when not overridden on the command line.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            streamable_port: 8081,
            websocket_port: 8082,
            shutdown_timeout_secs: 30,
            enable_origin_check: false,
            allowed_origins: vec!["*".to_string()],
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Builds the configuration from process environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Unset or unparseable values fall back to the defaults; configuration
    /// never fails at this stage (validation is separate).
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            http_port: parse_or(&lookup, "HTTP_PORT", defaults.http_port),
            streamable_port: parse_or(&lookup, "STREAMABLE_HTTP_PORT", defaults.streamable_port),
            websocket_port: parse_or(&lookup, "WEBSOCKET_PORT", defaults.websocket_port),
            shutdown_timeout_secs: parse_or(
                &lookup,
                "SHUTDOWN_TIMEOUT",
                defaults.shutdown_timeout_secs,
            ),
            enable_origin_check: parse_or(
                &lookup,
                "ENABLE_ORIGIN_CHECK",
                defaults.enable_origin_check,
            ),
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .filter(|v| !v.is_empty())
                .map_or(defaults.allowed_origins, |v| {
                    v.split(',').map(|s| s.trim().to_string()).collect()
                }),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a port is zero or two
    /// transports share a port.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ports = [
            ("HTTP_PORT", self.http_port),
            ("STREAMABLE_HTTP_PORT", self.streamable_port),
            ("WEBSOCKET_PORT", self.websocket_port),
        ];

        for (name, port) in ports {
            if port == 0 {
                return Err(ConfigError::Validation {
                    message: format!("{name} must not be 0"),
                });
            }
        }

        for i in 0..ports.len() {
            for (other_name, other_port) in &ports[i + 1..] {
                if ports[i].1 == *other_port {
                    return Err(ConfigError::Validation {
                        message: format!("{} and {other_name} share port {other_port}", ports[i].0),
                    });
                }
            }
        }

        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::Validation {
                message: "SHUTDOWN_TIMEOUT must not be 0".to_string(),
            });
        }

        Ok(())
    }

    /// Bind address for the REST API server.
    #[must_use]
    pub const fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.http_port)
    }

    /// Bind address for the streamable HTTP server.
    #[must_use]
    pub const fn streamable_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.streamable_port)
    }

    /// Bind address for the WebSocket server.
    #[must_use]
    pub const fn websocket_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.websocket_port)
    }

    /// Graceful-shutdown deadline as a duration.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Parses an environment value, falling back to the default on absence or
/// parse failure.
fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn env_overrides_apply() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HTTP_PORT", "9000"),
            ("STREAMABLE_HTTP_PORT", "9001"),
            ("WEBSOCKET_PORT", "9002"),
            ("SHUTDOWN_TIMEOUT", "5"),
            ("ENABLE_ORIGIN_CHECK", "true"),
            ("ALLOWED_ORIGINS", "example.com, other.example"),
        ]));

        assert_eq!(config.http_port, 9000);
        assert_eq!(config.streamable_port, 9001);
        assert_eq!(config.websocket_port, 9002);
        assert_eq!(config.shutdown_timeout_secs, 5);
        assert!(config.enable_origin_check);
        assert_eq!(
            config.allowed_origins,
            vec!["example.com".to_string(), "other.example".to_string()]
        );
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HTTP_PORT", "not-a-port"),
            ("ENABLE_ORIGIN_CHECK", "maybe"),
        ]));
        assert_eq!(config.http_port, 8080);
        assert!(!config.enable_origin_check);
    }

    #[test]
    fn empty_origin_list_falls_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[("ALLOWED_ORIGINS", "")]));
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn default_config_validates() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let config = ServerConfig {
            http_port: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_ports_are_rejected() {
        let config = ServerConfig {
            http_port: 8081,
            ..ServerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("8081"));
    }

    #[test]
    fn addresses_use_configured_ports() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr().port(), 8080);
        assert_eq!(config.streamable_addr().port(), 8081);
        assert_eq!(config.websocket_addr().port(), 8082);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }
}
