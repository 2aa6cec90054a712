use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::{Datelike, Utc};

use crate::underwriting::{DocumentCheckMode, ScoringModel};

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
    pub underwriting: UnderwritingSettings,
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
            telemetry: TelemetryConfig { log_level },
            underwriting: UnderwritingSettings::from_env()?,
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

/// Dials for the decision core that integrators are expected to pick explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnderwritingSettings {
    pub scoring_model: ScoringModel,
    pub document_check: DocumentCheckMode,
    /// Pins the year used for vehicle-age math. `None` follows the UTC clock.
    pub reference_year: Option<i32>,
}

impl Default for UnderwritingSettings {
    fn default() -> Self {
        Self {
            scoring_model: ScoringModel::Additive,
            document_check: DocumentCheckMode::Category,
            reference_year: None,
        }
    }
}

impl UnderwritingSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let scoring_model = match env::var("UNDERWRITING_SCORING_MODEL") {
            Ok(raw) => ScoringModel::parse(&raw).ok_or(ConfigError::InvalidScoringModel(raw))?,
            Err(_) => ScoringModel::Additive,
        };

        let document_check = match env::var("UNDERWRITING_DOCUMENT_CHECK") {
            Ok(raw) => {
                DocumentCheckMode::parse(&raw).ok_or(ConfigError::InvalidDocumentCheck(raw))?
            }
            Err(_) => DocumentCheckMode::Category,
        };

        let reference_year = match env::var("UNDERWRITING_REFERENCE_YEAR") {
            Ok(raw) => Some(
                raw.trim()
                    .parse::<i32>()
                    .map_err(|_| ConfigError::InvalidReferenceYear(raw))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            scoring_model,
            document_check,
            reference_year,
        })
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Utc::now().year())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidScoringModel(String),
    InvalidDocumentCheck(String),
    InvalidReferenceYear(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidScoringModel(value) => write!(
                f,
                "UNDERWRITING_SCORING_MODEL must be 'additive' or 'legacy_severity' (found '{value}')"
            ),
            ConfigError::InvalidDocumentCheck(value) => write!(
                f,
                "UNDERWRITING_DOCUMENT_CHECK must be 'category' or 'name_substring' (found '{value}')"
            ),
            ConfigError::InvalidReferenceYear(value) => write!(
                f,
                "UNDERWRITING_REFERENCE_YEAR must be a calendar year (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
