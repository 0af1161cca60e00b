use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::evaluation::{EvaluationConfig, EvaluationStrategy};
use crate::oracle::DEFAULT_CACHE_CAPACITY;

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
    pub oracle: OracleConfig,
    pub evaluation: EvaluationConfig,
    pub data: DataSources,
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
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(value) => {
                LogFormat::parse(&value).ok_or_else(|| ConfigError::invalid("APP_LOG_FORMAT", &value))?
            }
            Err(_) => LogFormat::default(),
        };

        let timeout_secs = parse_var("ORACLE_TIMEOUT_SECS", 60u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::invalid("ORACLE_TIMEOUT_SECS", "0"));
        }
        let cache_capacity = parse_var("ORACLE_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?;
        if cache_capacity == 0 {
            return Err(ConfigError::invalid("ORACLE_CACHE_CAPACITY", "0"));
        }
        let oracle = OracleConfig {
            base_url: env::var("ORACLE_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("ORACLE_API_KEY").ok().filter(|key| !key.is_empty()),
            model: env::var("ORACLE_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            timeout: Duration::from_secs(timeout_secs),
            temperature: parse_var("ORACLE_TEMPERATURE", 0.2f32)?,
            max_tokens: parse_var("ORACLE_MAX_TOKENS", 2000u32)?,
            cache_enabled: parse_flag("ORACLE_CACHE", true)?,
            cache_capacity,
        };

        let strategy = match env::var("EVALUATION_STRATEGY") {
            Ok(value) => EvaluationStrategy::parse(&value)
                .ok_or_else(|| ConfigError::invalid("EVALUATION_STRATEGY", &value))?,
            Err(_) => EvaluationStrategy::default(),
        };
        let worker_cap = parse_var("EVALUATION_WORKERS", 3usize)?;
        if worker_cap == 0 {
            return Err(ConfigError::invalid("EVALUATION_WORKERS", "0"));
        }
        let target_score = parse_var("EVALUATION_TARGET_SCORE", 3.5f64)?;
        if !(1.0..=4.0).contains(&target_score) {
            return Err(ConfigError::invalid(
                "EVALUATION_TARGET_SCORE",
                &target_score.to_string(),
            ));
        }
        let evaluation = EvaluationConfig {
            strategy,
            worker_cap,
            target_score,
            prioritize: parse_flag("EVALUATION_PRIORITIZE", false)?,
            oracle_timeout: oracle.timeout,
        };

        let data = DataSources {
            rubrics: env::var("RUBRICS_PATH").ok().map(PathBuf::from),
            statistics: env::var("STATISTICS_PATH").ok().map(PathBuf::from),
            submissions: env::var("SUBMISSIONS_PATH").ok().map(PathBuf::from),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            oracle,
            evaluation,
            data,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::invalid(name, &value)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(name, &value)),
        },
        Err(_) => Ok(default),
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
    pub log_format: LogFormat,
}

/// Line format of emitted events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    /// One JSON object per event, for log shippers.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Connection settings for the OpenAI-compatible condition oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    pub cache_enabled: bool,
    /// Most answers the cache keeps before evicting the oldest.
    pub cache_capacity: usize,
}

/// Optional file-backed rubric, statistics and submission sources.
#[derive(Debug, Clone, Default)]
pub struct DataSources {
    pub rubrics: Option<PathBuf>,
    pub statistics: Option<PathBuf>,
    pub submissions: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { variable: &'static str, value: String },
}

impl ConfigError {
    fn invalid(variable: &'static str, value: &str) -> Self {
        Self::InvalidValue {
            variable,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "{variable} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
