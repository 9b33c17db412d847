use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::transfer::applications::EvaluationConfig;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub evaluation: EvaluationConfig,
    /// JSON reference catalog (base scores, requirements, quotas) loaded at startup.
    pub catalog_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let catalog_path = env::var("TRANSFER_CATALOG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            evaluation: evaluation_from_env()?,
            catalog_path,
        })
    }
}

fn evaluation_from_env() -> Result<EvaluationConfig, ConfigError> {
    let mut config = EvaluationConfig::default();

    if let Ok(value) = env::var("TRANSFER_MANUAL_REVIEW_BLOCKS") {
        config.manual_review_blocks = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => return Err(ConfigError::InvalidFlag("TRANSFER_MANUAL_REVIEW_BLOCKS")),
        };
    }

    if let Some(threshold) = rank_threshold("TRANSFER_ARCHITECTURE_RANK_THRESHOLD")? {
        config.architecture_rank_threshold = threshold;
    }
    if let Some(threshold) = rank_threshold("TRANSFER_DEFAULT_RANK_THRESHOLD")? {
        config.default_rank_threshold = threshold;
    }

    Ok(config)
}

fn rank_threshold(var: &'static str) -> Result<Option<u32>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .replace('_', "")
            .parse::<u32>()
            .ok()
            .filter(|threshold| *threshold > 0)
            .map(Some)
            .ok_or(ConfigError::InvalidRankThreshold(var)),
        Err(_) => Ok(None),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag(&'static str),
    InvalidRankThreshold(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag(var) => write!(f, "{var} must be true or false"),
            ConfigError::InvalidRankThreshold(var) => {
                write!(f, "{var} must be a positive whole number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidFlag(_)
            | ConfigError::InvalidRankThreshold(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "TRANSFER_CATALOG_PATH",
            "TRANSFER_MANUAL_REVIEW_BLOCKS",
            "TRANSFER_ARCHITECTURE_RANK_THRESHOLD",
            "TRANSFER_DEFAULT_RANK_THRESHOLD",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.evaluation, EvaluationConfig::default());
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn engine_overrides_come_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TRANSFER_MANUAL_REVIEW_BLOCKS", "yes");
        env::set_var("TRANSFER_ARCHITECTURE_RANK_THRESHOLD", "200_000");
        env::set_var("TRANSFER_CATALOG_PATH", "config/catalog.json");

        let config = AppConfig::load().expect("config loads");

        assert!(config.evaluation.manual_review_blocks);
        assert_eq!(config.evaluation.architecture_rank_threshold, 200_000);
        assert_eq!(config.evaluation.default_rank_threshold, 300_000);
        assert_eq!(
            config.catalog_path.as_deref(),
            Some(std::path::Path::new("config/catalog.json"))
        );
        reset_env();
    }

    #[test]
    fn rejects_malformed_engine_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TRANSFER_DEFAULT_RANK_THRESHOLD", "lots");
        let error = AppConfig::load().expect_err("threshold must be numeric");
        assert!(matches!(
            error,
            ConfigError::InvalidRankThreshold("TRANSFER_DEFAULT_RANK_THRESHOLD")
        ));

        reset_env();
        env::set_var("TRANSFER_MANUAL_REVIEW_BLOCKS", "sometimes");
        let error = AppConfig::load().expect_err("flag must be boolean");
        assert!(matches!(error, ConfigError::InvalidFlag(_)));
        reset_env();
    }
}
