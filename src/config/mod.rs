// Configuration module entry point
// Loads configuration from file, environment and built-in defaults

mod state;
mod types;

use hyper::header::HeaderValue;
use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, CorsConfig, HealthConfig, HttpConfig, LoggingConfig, PerformanceConfig,
    RoutesConfig, ServerConfig, StoreBackend, StoreConfig,
};

type DefaultBuilder = config::ConfigBuilder<config::builder::DefaultState>;

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional. Environment variables prefixed with `COMMUNITY__`
    /// override it, e.g. `COMMUNITY__SERVER__PORT=9000`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = Self::with_defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("COMMUNITY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Built-in defaults only, no file or environment
    pub fn defaults() -> Result<Self, config::ConfigError> {
        Self::with_defaults()?.build()?.try_deserialize()
    }

    fn with_defaults() -> Result<DefaultBuilder, config::ConfigError> {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8787)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.shutdown_timeout", 10)?
            .set_default("http.server_name", "community-api")?
            .set_default("http.max_body_size", 1_048_576) // 1MB
    }

    /// Reject values that would only fail later, per request
    fn validate(&self) -> Result<(), config::ConfigError> {
        let cors = &self.http.cors;
        for (name, value) in [
            ("http.cors.allow_origin", &cors.allow_origin),
            ("http.cors.allow_methods", &cors.allow_methods),
            ("http.cors.allow_headers", &cors.allow_headers),
        ] {
            if HeaderValue::from_str(value).is_err() {
                return Err(config::ConfigError::Message(format!(
                    "{name} is not a valid header value: {value:?}"
                )));
            }
        }

        if self.store.max_retries == 0 {
            return Err(config::ConfigError::Message(
                "store.max_retries must be at least 1".to_string(),
            ));
        }

        if !matches!(self.logging.event_format.as_str(), "text" | "json") {
            return Err(config::ConfigError::Message(format!(
                "logging.event_format must be 'text' or 'json', got '{}'",
                self.logging.event_format
            )));
        }

        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cfg = Config::defaults().unwrap();
        assert_eq!(cfg.server.port, 8787);
        assert_eq!(cfg.http.cors, CorsConfig::default());
        assert_eq!(cfg.http.cors.allow_methods, "GET,POST,PUT,DELETE,OPTIONS");
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.store.max_retries, 16);
        assert_eq!(cfg.routes.static_dir, None);
        assert_eq!(cfg.routes.health.readiness_path, "/readyz");
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::defaults().unwrap();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8787);

        cfg.server.host = "not a host".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_header_value() {
        let mut cfg = Config::defaults().unwrap();
        cfg.http.cors.allow_origin = "bad\nvalue".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("community-api-{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(
            &path,
            "[server]\nport = 9100\n\n[store]\nbackend = \"file\"\npath = \"/tmp/c.json\"\n",
        )
        .unwrap();

        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.store.backend, StoreBackend::File);
        assert_eq!(cfg.store.path, "/tmp/c.json");
        assert_eq!(cfg.store.max_retries, 16);
        assert_eq!(cfg.http.server_name, "community-api");
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut cfg = Config::defaults().unwrap();
        cfg.store.max_retries = 0;
        assert!(cfg.validate().is_err());
    }
}
