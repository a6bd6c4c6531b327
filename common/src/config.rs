//! Service configuration.
//!
//! Loads per-service settings from environment variables with sensible
//! defaults, so every binary can start without any configuration.

/// Runtime configuration shared by all services.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name of the service this config was loaded for.
    pub service_name: String,
    /// Bind address.
    pub host: String,
    /// Bind port (overridable via `SERVER_PORT`).
    pub port: u16,
    /// Timeout for acquiring a backend connection, in seconds.
    pub connect_timeout_secs: u64,
    /// Maximum connections per adapter pool.
    pub max_connections: u32,
}

impl AppConfig {
    /// Loads configuration for the given service from the environment.
    pub fn load_with_service(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            host: env_or("SERVER_HOST", "0.0.0.0"),
            port: env_parse("SERVER_PORT", 8080),
            connect_timeout_secs: env_parse("CONNECT_TIMEOUT_SECS", 10),
            max_connections: env_parse("MAX_CONNECTIONS", 1),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        let config = AppConfig::load_with_service("test-service");
        assert_eq!(config.service_name, "test-service");
        assert!(!config.host.is_empty());
        assert!(config.connect_timeout_secs > 0);
    }
}
