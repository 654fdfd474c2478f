use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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
    pub matching: MatchingConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            matching: MatchingConfig::from_env()?,
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
    pub ansi: bool,
}

/// Knobs for the sweep loop, the scoring policy, and where registries and stores live.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub sweep_interval: Duration,
    pub sweep_concurrency: usize,
    pub admission_threshold: f64,
    pub default_language: String,
    pub template_cache_capacity: usize,
    pub templates_path: Option<PathBuf>,
    pub jobs_csv: Option<PathBuf>,
    pub workers_csv: Option<PathBuf>,
    pub store_dir: Option<PathBuf>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(300),
            sweep_concurrency: 4,
            admission_threshold: 40.0,
            default_language: "hi".to_string(),
            template_cache_capacity: 64,
            templates_path: None,
            jobs_csv: None,
            workers_csv: None,
            store_dir: None,
        }
    }
}

impl MatchingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let interval_secs = parse_var("MATCH_SWEEP_INTERVAL_SECS", 300u64)?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MATCH_SWEEP_INTERVAL_SECS",
                value: interval_secs.to_string(),
            });
        }

        let sweep_concurrency = parse_var("MATCH_SWEEP_CONCURRENCY", defaults.sweep_concurrency)?;
        if sweep_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MATCH_SWEEP_CONCURRENCY",
                value: sweep_concurrency.to_string(),
            });
        }

        let admission_threshold =
            parse_var("MATCH_ADMISSION_THRESHOLD", defaults.admission_threshold)?;
        if !(0.0..=100.0).contains(&admission_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "MATCH_ADMISSION_THRESHOLD",
                value: admission_threshold.to_string(),
            });
        }

        let default_language = env::var("MATCH_DEFAULT_LANGUAGE")
            .map(|value| value.trim().to_ascii_lowercase())
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.default_language);

        Ok(Self {
            sweep_interval: Duration::from_secs(interval_secs),
            sweep_concurrency,
            admission_threshold,
            default_language,
            template_cache_capacity: parse_var(
                "MATCH_TEMPLATE_CACHE_CAPACITY",
                defaults.template_cache_capacity,
            )?,
            templates_path: path_var("MATCH_TEMPLATES_PATH"),
            jobs_csv: path_var("MATCH_JOBS_CSV"),
            workers_csv: path_var("MATCH_WORKERS_CSV"),
            store_dir: path_var("MATCH_STORE_DIR"),
        })
    }
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        _ => Ok(default),
    }
}

fn path_var(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "MATCH_SWEEP_INTERVAL_SECS",
            "MATCH_SWEEP_CONCURRENCY",
            "MATCH_ADMISSION_THRESHOLD",
            "MATCH_DEFAULT_LANGUAGE",
            "MATCH_TEMPLATE_CACHE_CAPACITY",
            "MATCH_TEMPLATES_PATH",
            "MATCH_JOBS_CSV",
            "MATCH_WORKERS_CSV",
            "MATCH_STORE_DIR",
        ] {
            env::remove_var(key);
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
        assert_eq!(config.matching.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.matching.sweep_concurrency, 4);
        assert_eq!(config.matching.admission_threshold, 40.0);
        assert_eq!(config.matching.default_language, "hi");
        assert!(config.matching.jobs_csv.is_none());
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
    fn matching_overrides_are_parsed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MATCH_SWEEP_INTERVAL_SECS", "60");
        env::set_var("MATCH_DEFAULT_LANGUAGE", " EN ");
        env::set_var("MATCH_STORE_DIR", "/var/lib/rozgar");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.matching.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.matching.default_language, "en");
        assert_eq!(
            config.matching.store_dir,
            Some(PathBuf::from("/var/lib/rozgar"))
        );
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MATCH_ADMISSION_THRESHOLD", "140");
        let error = AppConfig::load().expect_err("threshold above 100 is invalid");
        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                key: "MATCH_ADMISSION_THRESHOLD",
                ..
            }
        ));
        reset_env();
    }

    #[test]
    fn rejects_zero_interval() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MATCH_SWEEP_INTERVAL_SECS", "0");
        assert!(AppConfig::load().is_err());
        reset_env();
    }
}
