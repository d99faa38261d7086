mod quality;

pub use quality::{
    ClassificationFile, PipelineOptions, QualityConfig, QualityConfigFile, RuleFile,
    DEFAULT_BATCH_SIZE, DEFAULT_PIPELINE_NAME, DEFAULT_TABLE,
};

use crate::workflows::quality::classifier::ClassificationError;
use crate::workflows::quality::rules::RuleError;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub paths: PathConfig,
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

        let quality_config = env::var("QUALITY_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/quality.json"));
        let output_dir = env::var("QUALITY_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("output"));

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            paths: PathConfig {
                quality_config,
                output_dir,
            },
        })
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

/// Filesystem locations for the rules file and exported batches.
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub quality_config: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    UnknownPreset(String),
    Rules(RuleError),
    Classification(ClassificationError),
    InvalidPipelineOption(&'static str),
    InvalidAlertThreshold(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::Read { path, .. } => {
                write!(f, "unable to read quality config {}", path.display())
            }
            ConfigError::Malformed { path, source } => {
                write!(f, "quality config {} is malformed: {}", path.display(), source)
            }
            ConfigError::UnknownPreset(name) => {
                write!(f, "unknown preset '{name}' (expected 'etl' or 'unified')")
            }
            ConfigError::Rules(err) => write!(f, "invalid rule: {err}"),
            ConfigError::Classification(err) => write!(f, "invalid classification: {err}"),
            ConfigError::InvalidPipelineOption(detail) => {
                write!(f, "invalid pipeline option: {detail}")
            }
            ConfigError::InvalidAlertThreshold(detail) => {
                write!(f, "invalid alert threshold: {detail}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::UnknownPreset(_)
            | ConfigError::InvalidPipelineOption(_)
            | ConfigError::InvalidAlertThreshold(_) => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Malformed { source, .. } => Some(source),
            ConfigError::Rules(err) => Some(err),
            ConfigError::Classification(err) => Some(err),
        }
    }
}

impl From<RuleError> for ConfigError {
    fn from(value: RuleError) -> Self {
        Self::Rules(value)
    }
}

impl From<ClassificationError> for ConfigError {
    fn from(value: ClassificationError) -> Self {
        Self::Classification(value)
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("QUALITY_CONFIG_PATH");
        env::remove_var("QUALITY_OUTPUT_DIR");
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
        assert_eq!(
            config.paths.quality_config,
            PathBuf::from("config/quality.json")
        );
        assert_eq!(config.paths.output_dir, PathBuf::from("output"));
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
    fn rejects_non_numeric_port() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_PORT", "eighty");
        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidPort)));
        reset_env();
    }

    #[test]
    fn reads_quality_paths_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("QUALITY_CONFIG_PATH", "/etc/honey/rules.json");
        env::set_var("QUALITY_OUTPUT_DIR", "/var/lib/honey");
        env::set_var("APP_ENV", "prod");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(
            config.paths.quality_config,
            PathBuf::from("/etc/honey/rules.json")
        );
        assert_eq!(config.paths.output_dir, PathBuf::from("/var/lib/honey"));
        reset_env();
    }
}
