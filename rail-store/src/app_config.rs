use serde::Deserialize;
use std::env;

/// Built-in defaults, so the binary starts from any working directory
const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub events: EventsConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KafkaConfig {
    pub brokers: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    pub allow_named_login: bool,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(config::Environment::with_prefix("RAIL").separator("__"))
    }

    fn load_with(environment: config::Environment) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::from_str(DEFAULTS, config::FileFormat::Toml))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // RAIL__SERVER__PORT=9000 sets server.port
            .add_source(environment)
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(config::ConfigError::Message(
                "database.url is required when storage.backend = \"postgres\"".to_string(),
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(config::ConfigError::Message(
                "events.channel_capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        config::Environment::with_prefix("RAIL")
            .separator("__")
            .source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = Config::load_with(environment(&[])).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.url.is_none());
        assert!(config.kafka.brokers.is_none());
        assert_eq!(config.events.channel_capacity, 256);
        assert!(config.auth.allow_named_login);
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::load_with(environment(&[
            ("RAIL__SERVER__PORT", "9000"),
            ("RAIL__STORAGE__BACKEND", "postgres"),
            ("RAIL__DATABASE__URL", "postgres://rail@localhost/rail"),
            ("RAIL__AUTH__ALLOW_NAMED_LOGIN", "false"),
        ]))
        .unwrap();

        assert!(!config.auth.allow_named_login);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.database.url.as_deref(), Some("postgres://rail@localhost/rail"));
    }

    #[test]
    fn test_postgres_requires_url() {
        let result = Config::load_with(environment(&[("RAIL__STORAGE__BACKEND", "postgres")]));
        assert!(result.is_err());
    }
}
