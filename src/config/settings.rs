//! Application settings loaded from environment variables.

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use super::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_ELEVENLABS_API_URL, DEFAULT_JWT_COOKIE_EXPIRES_IN_DAYS,
    DEFAULT_JWT_EXPIRES_IN, DEFAULT_RATE_LIMIT_MAX_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW_MS,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT, MAX_SESSION_LIFETIME_DAYS, MIN_JWT_SECRET_LENGTH,
};
use crate::errors::{AppError, AppResult};

/// Secret used when `JWT_SECRET` is unset in development.
const DEV_JWT_SECRET: &str = "dev-secret-key-minimum-32-chars!!";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        !self.is_production()
    }
}

impl From<&str> for Environment {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub environment: Environment,
    pub database_url: String,
    jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub jwt_cookie_expires_in_days: i64,
    elevenlabs_api_key: Option<String>,
    pub elevenlabs_agent_id: Option<String>,
    pub elevenlabs_api_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    /// Peers whose `X-Forwarded-For` is believed when identifying clients
    pub trusted_proxies: Vec<IpAddr>,
    pub log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("database_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expires_in", &self.jwt_expires_in)
            .field("jwt_cookie_expires_in_days", &self.jwt_cookie_expires_in_days)
            .field(
                "elevenlabs_api_key",
                &self.elevenlabs_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("elevenlabs_agent_id", &self.elevenlabs_agent_id)
            .field("elevenlabs_api_url", &self.elevenlabs_api_url)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("trusted_proxies", &self.trusted_proxies)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    ///
    /// # Errors
    /// Fails if `JWT_SECRET` is missing in production, is too short, or if
    /// `JWT_EXPIRES_IN` cannot be parsed.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let environment = Environment::from(
            env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()).as_str(),
        );

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if environment.is_development() => {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                DEV_JWT_SECRET.to_string()
            }
            Err(_) => {
                return Err(AppError::internal(
                    "JWT_SECRET environment variable must be set in production",
                ))
            }
        };

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(AppError::internal(format!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        let database_url = if environment.is_production() {
            env::var("DATABASE_URL_PROD").or_else(|_| env::var("DATABASE_URL"))
        } else {
            env::var("DATABASE_URL")
        }
        .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let jwt_expires_in_raw =
            env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| DEFAULT_JWT_EXPIRES_IN.to_string());
        let jwt_expires_in = parse_duration(&jwt_expires_in_raw)
            .filter(|lifetime| valid_lifetime(*lifetime))
            .ok_or_else(|| {
                AppError::internal(format!("Invalid JWT_EXPIRES_IN value: {}", jwt_expires_in_raw))
            })?;

        let jwt_cookie_expires_in_days: i64 =
            parse_env("JWT_COOKIE_EXPIRES_IN").unwrap_or(DEFAULT_JWT_COOKIE_EXPIRES_IN_DAYS);
        if !(1..=MAX_SESSION_LIFETIME_DAYS).contains(&jwt_cookie_expires_in_days) {
            return Err(AppError::internal(format!(
                "JWT_COOKIE_EXPIRES_IN must be between 1 and {} days",
                MAX_SESSION_LIFETIME_DAYS
            )));
        }

        Ok(Self {
            environment,
            database_url,
            jwt_secret,
            jwt_expires_in,
            jwt_cookie_expires_in_days,
            elevenlabs_api_key: non_empty_env("ELEVENLABS_API_KEY"),
            elevenlabs_agent_id: non_empty_env("AGENT_ID"),
            elevenlabs_api_url: env::var("ELEVENLABS_API_URL")
                .unwrap_or_else(|_| DEFAULT_ELEVENLABS_API_URL.to_string()),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_env("PORT").unwrap_or(DEFAULT_SERVER_PORT),
            rate_limit_window: Duration::from_millis(
                parse_env("RATE_LIMIT_WINDOW_MS").unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_MS),
            ),
            rate_limit_max_requests: parse_env("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS),
            trusted_proxies: parse_ip_list(&env::var("TRUSTED_PROXIES").unwrap_or_default())?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Build a configuration for tests and embedded use without touching the
    /// process environment.
    pub fn for_environment(environment: Environment, jwt_secret: impl Into<String>) -> Self {
        Self {
            environment,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            jwt_secret: jwt_secret.into(),
            jwt_expires_in: Duration::from_secs(90 * 24 * 3600),
            jwt_cookie_expires_in_days: DEFAULT_JWT_COOKIE_EXPIRES_IN_DAYS,
            elevenlabs_api_key: None,
            elevenlabs_agent_id: None,
            elevenlabs_api_url: DEFAULT_ELEVENLABS_API_URL.to_string(),
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            rate_limit_window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            trusted_proxies: Vec::new(),
            log_level: "info".to_string(),
        }
    }

    /// Set provider credentials (builder style).
    pub fn with_elevenlabs(mut self, api_key: Option<String>, agent_id: Option<String>) -> Self {
        self.elevenlabs_api_key = api_key;
        self.elevenlabs_agent_id = agent_id;
        self
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// ElevenLabs API key, if configured.
    pub fn elevenlabs_api_key(&self) -> Option<&str> {
        self.elevenlabs_api_key.as_deref()
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Non-zero and at most `MAX_SESSION_LIFETIME_DAYS`.
fn valid_lifetime(lifetime: Duration) -> bool {
    let max = Duration::from_secs(MAX_SESSION_LIFETIME_DAYS as u64 * 86_400);
    !lifetime.is_zero() && lifetime <= max
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Comma-separated IP addresses, e.g. `TRUSTED_PROXIES=10.0.0.1,::1`.
fn parse_ip_list(raw: &str) -> AppResult<Vec<IpAddr>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse()
                .map_err(|_| AppError::internal(format!("Invalid TRUSTED_PROXIES entry: {}", entry)))
        })
        .collect()
}

/// Parse a lifetime such as `90d`, `12h`, `30m`, `45s` or bare seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (digits, multiplier) = match value.chars().last()? {
        'd' => (&value[..value.len() - 1], 86_400),
        'h' => (&value[..value.len() - 1], 3_600),
        'm' => (&value[..value.len() - 1], 60),
        's' => (&value[..value.len() - 1], 1),
        c if c.is_ascii_digit() => (value, 1),
        _ => return None,
    };

    let amount: u64 = digits.trim().parse().ok()?;
    Some(Duration::from_secs(amount.checked_mul(multiplier)?))
}
