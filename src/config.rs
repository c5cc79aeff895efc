//! Service configuration.
//!
//! Values are read once at startup from environment variables, after an
//! optional `.env` file has been loaded by `main`:
//!
//! - `API_KEY`: shared secret expected in the `X-API-Key` header (unset or blank
//!   means every protected request fails with 500)
//! - `HOST` / `PORT`: bind address (default: `0.0.0.0:8000`)
//! - `CONVERSION_TIMEOUT_SECS`: bound on a single conversion (default: 30)
//! - `MAX_UPLOAD_BYTES`: request body limit (default: 10 MiB)
//! - `LOAD_SYSTEM_FONTS`: load installed fonts for `<text>` (default: true)
//! - `LOG_FORMAT`: `text` or `json` (default: text)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP collector endpoint (telemetry off if unset)
//! - `OTEL_SERVICE_NAME`: service name reported with spans (default: svg2pdf-service)

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_SERVICE_NAME: &str = "svg2pdf-service";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub conversion_timeout: Duration,
    pub max_upload_bytes: usize,
    pub load_system_fonts: bool,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
    pub otel_service_name: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the raw value
    /// of a variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let conversion_timeout = parse(&var, "CONVERSION_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.conversion_timeout);
        if conversion_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "CONVERSION_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }

        Ok(Self {
            api_key: var("API_KEY"),
            host: parse(&var, "HOST")?.unwrap_or(defaults.host),
            port: parse(&var, "PORT")?.unwrap_or(defaults.port),
            conversion_timeout,
            max_upload_bytes: parse(&var, "MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes),
            load_system_fonts: parse(&var, "LOAD_SYSTEM_FONTS")?
                .unwrap_or(defaults.load_system_fonts),
            log_format: parse(&var, "LOG_FORMAT")?.unwrap_or(defaults.log_format),
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            otel_service_name: var("OTEL_SERVICE_NAME").unwrap_or(defaults.otel_service_name),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse<T, V>(var: &V, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|value| {
            value.parse::<T>().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            conversion_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            load_system_fonts: true,
            log_format: LogFormat::Text,
            otlp_endpoint: None,
            otel_service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

// The API key never reaches logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("conversion_timeout", &self.conversion_timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("load_system_fonts", &self.load_system_fonts)
            .field("log_format", &self.log_format)
            .field("otlp_endpoint", &self.otlp_endpoint)
            .field("otel_service_name", &self.otel_service_name)
            .finish()
    }
}
