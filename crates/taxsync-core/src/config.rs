//! Configuration module
//!
//! This module provides configuration structures for the API, the provider clients
//! and the status poller. A `Config` is loaded once at start-up and shared
//! read-only with every component.

use std::env;

use base64::{engine::general_purpose, Engine as _};

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;
const PROVIDER_TIMEOUT_SECS: u64 = 30;
const STATUS_POLL_INTERVAL_SECS: u64 = 300;
const STATUS_POLL_BATCH_SIZE: i64 = 50;
const STATUS_POLL_MAX_CONCURRENCY: usize = 10;
const STATUS_POLL_CHECK_TIMEOUT_SECS: u64 = 20;

/// HTTP server and database settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    pub service_api_key: Option<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// In-flight request cap for the whole router
    pub http_concurrency_limit: usize,
}

/// How the submitter authenticates against the e-file create endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EfileAuthMode {
    /// `Authorization: Basic base64(client_id:client_secret)`
    Basic,
    /// Self-signed RS256 assertion sent as a bearer token
    JwtBearer,
}

/// E-file provider settings
#[derive(Clone, Debug)]
pub struct EfileConfig {
    pub base_url: String,
    pub auth_mode: EfileAuthMode,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub jwt_private_key: Option<String>,
    pub jwt_audience: Option<String>,
    /// Key and secret used to sign status requests
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub timeout_seconds: u64,
}

/// Accounting provider settings (token endpoint, REST API, webhooks)
#[derive(Clone, Debug)]
pub struct AccountingConfig {
    pub api_base_url: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub webhook_key: Option<String>,
    pub timeout_seconds: u64,
}

/// Status poller scheduling and backpressure settings
#[derive(Clone, Debug)]
pub struct PollerConfig {
    /// Seconds between scheduled sweeps. 0 = disabled.
    pub interval_secs: u64,
    /// Filings selected per form type per sweep
    pub batch_size: i64,
    pub max_concurrency: usize,
    pub check_timeout_secs: u64,
    /// Optional cap on total checks per sweep
    pub max_filings: Option<usize>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: STATUS_POLL_INTERVAL_SECS,
            batch_size: STATUS_POLL_BATCH_SIZE,
            max_concurrency: STATUS_POLL_MAX_CONCURRENCY,
            check_timeout_secs: STATUS_POLL_CHECK_TIMEOUT_SECS,
            max_filings: None,
        }
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub efile: EfileConfig,
    pub accounting: AccountingConfig,
    pub poller: PollerConfig,
    /// Base64-encoded 32-byte key for OAuth token encryption
    pub token_encryption_key: Option<String>,
}

impl Config {
    /// Load `.env` (if present) and read configuration from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup and validate it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parsed = |key: &str| var(key).and_then(|v| v.trim().parse::<u64>().ok());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let port = match var("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let server = ServerConfig {
            port,
            environment,
            service_api_key: var("SERVICE_API_KEY"),
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: parsed("DB_MAX_CONNECTIONS")
                .map(|v| v as u32)
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: parsed("DB_TIMEOUT_SECONDS").unwrap_or(CONNECTION_TIMEOUT_SECS),
            http_concurrency_limit: match var("HTTP_CONCURRENCY_LIMIT") {
                Some(v) => v.trim().parse().map_err(|_| {
                    anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be a valid number")
                })?,
                None => HTTP_CONCURRENCY_LIMIT,
            },
        };

        let auth_mode = match var("EFILE_AUTH_MODE")
            .unwrap_or_else(|| "basic".to_string())
            .to_lowercase()
            .as_str()
        {
            "basic" => EfileAuthMode::Basic,
            "jwt" | "jwt_bearer" => EfileAuthMode::JwtBearer,
            other => {
                return Err(anyhow::anyhow!(
                    "EFILE_AUTH_MODE must be 'basic' or 'jwt', got '{}'",
                    other
                ))
            }
        };

        let efile = EfileConfig {
            base_url: var("EFILE_BASE_URL")
                .unwrap_or_else(|| "https://api.efile.example.com".to_string()),
            auth_mode,
            client_id: var("EFILE_CLIENT_ID"),
            client_secret: var("EFILE_CLIENT_SECRET"),
            jwt_private_key: var("EFILE_JWT_PRIVATE_KEY"),
            jwt_audience: var("EFILE_JWT_AUDIENCE"),
            api_key: var("EFILE_API_KEY"),
            api_secret: var("EFILE_API_SECRET"),
            timeout_seconds: parsed("EFILE_TIMEOUT_SECONDS").unwrap_or(PROVIDER_TIMEOUT_SECS),
        };

        let accounting = AccountingConfig {
            api_base_url: var("ACCOUNTING_API_BASE_URL")
                .unwrap_or_else(|| "https://api.accounting.example.com/api.xro/2.0".to_string()),
            token_url: var("ACCOUNTING_TOKEN_URL")
                .unwrap_or_else(|| "https://identity.accounting.example.com/connect/token".to_string()),
            client_id: var("ACCOUNTING_CLIENT_ID"),
            client_secret: var("ACCOUNTING_CLIENT_SECRET"),
            webhook_key: var("ACCOUNTING_WEBHOOK_KEY"),
            timeout_seconds: parsed("ACCOUNTING_TIMEOUT_SECONDS")
                .unwrap_or(PROVIDER_TIMEOUT_SECS),
        };

        let poller = PollerConfig {
            interval_secs: parsed("STATUS_POLL_INTERVAL_SECS").unwrap_or(STATUS_POLL_INTERVAL_SECS),
            batch_size: parsed("STATUS_POLL_BATCH_SIZE")
                .map(|v| v as i64)
                .unwrap_or(STATUS_POLL_BATCH_SIZE),
            max_concurrency: parsed("STATUS_POLL_MAX_CONCURRENCY")
                .map(|v| v as usize)
                .unwrap_or(STATUS_POLL_MAX_CONCURRENCY),
            check_timeout_secs: parsed("STATUS_POLL_CHECK_TIMEOUT_SECS")
                .unwrap_or(STATUS_POLL_CHECK_TIMEOUT_SECS),
            max_filings: parsed("STATUS_POLL_MAX_FILINGS").map(|v| v as usize),
        };

        let config = Config {
            server,
            efile,
            accounting,
            poller,
            token_encryption_key: var("TOKEN_ENCRYPTION_KEY"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.server.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let url = &self.server.database_url;
        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.is_production() {
            if self.server.service_api_key.is_none() {
                return Err(anyhow::anyhow!("SERVICE_API_KEY must be set in production"));
            }
            if self.accounting.webhook_key.is_none() {
                return Err(anyhow::anyhow!(
                    "ACCOUNTING_WEBHOOK_KEY must be set in production"
                ));
            }
        }

        if self.efile.auth_mode == EfileAuthMode::JwtBearer && self.efile.jwt_private_key.is_none()
        {
            return Err(anyhow::anyhow!(
                "EFILE_AUTH_MODE=jwt requires EFILE_JWT_PRIVATE_KEY to be set"
            ));
        }

        if let Some(key) = &self.token_encryption_key {
            let decoded = general_purpose::STANDARD
                .decode(key)
                .map_err(|e| anyhow::anyhow!("TOKEN_ENCRYPTION_KEY is not valid base64: {}", e))?;
            if decoded.len() != 32 {
                return Err(anyhow::anyhow!(
                    "TOKEN_ENCRYPTION_KEY must decode to 32 bytes"
                ));
            }
        }

        if self.server.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!(
                "HTTP_CONCURRENCY_LIMIT must be greater than 0"
            ));
        }

        if self.poller.max_concurrency == 0 {
            return Err(anyhow::anyhow!(
                "STATUS_POLL_MAX_CONCURRENCY must be greater than 0"
            ));
        }
        if self.poller.batch_size <= 0 {
            return Err(anyhow::anyhow!("STATUS_POLL_BATCH_SIZE must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgresql://localhost/taxsync")]).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.http_concurrency_limit, 10_000);
        assert_eq!(config.efile.auth_mode, EfileAuthMode::Basic);
        assert_eq!(config.poller.batch_size, 50);
        assert_eq!(config.poller.max_concurrency, 10);
        assert!(config.poller.max_filings.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_missing_database_url_fails() {
        assert!(load(&[]).is_err());
    }

    #[test]
    fn test_production_requires_webhook_key_and_service_key() {
        let err = load(&[
            ("DATABASE_URL", "postgresql://localhost/taxsync"),
            ("ENVIRONMENT", "production"),
            ("SERVICE_API_KEY", "svc"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("ACCOUNTING_WEBHOOK_KEY"));

        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/taxsync"),
            ("ENVIRONMENT", "production"),
            ("SERVICE_API_KEY", "svc"),
            ("ACCOUNTING_WEBHOOK_KEY", "whk"),
        ])
        .unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_jwt_mode_requires_private_key() {
        let err = load(&[
            ("DATABASE_URL", "postgresql://localhost/taxsync"),
            ("EFILE_AUTH_MODE", "jwt"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("EFILE_JWT_PRIVATE_KEY"));
    }

    #[test]
    fn test_encryption_key_must_be_32_bytes() {
        let err = load(&[
            ("DATABASE_URL", "postgresql://localhost/taxsync"),
            ("TOKEN_ENCRYPTION_KEY", "c2hvcnQ="),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn test_poller_overrides() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/taxsync"),
            ("STATUS_POLL_INTERVAL_SECS", "0"),
            ("STATUS_POLL_MAX_FILINGS", "25"),
            ("STATUS_POLL_MAX_CONCURRENCY", "4"),
        ])
        .unwrap();
        assert_eq!(config.poller.interval_secs, 0);
        assert_eq!(config.poller.max_filings, Some(25));
        assert_eq!(config.poller.max_concurrency, 4);
    }

    #[test]
    fn http_concurrency_limit_is_configurable() {
        let db = ("DATABASE_URL", "postgresql://localhost/taxsync");
        let config = load(&[db, ("HTTP_CONCURRENCY_LIMIT", "256")]).unwrap();
        assert_eq!(config.server.http_concurrency_limit, 256);

        assert!(load(&[db, ("HTTP_CONCURRENCY_LIMIT", "0")]).is_err());
        assert!(load(&[db, ("HTTP_CONCURRENCY_LIMIT", "lots")]).is_err());
    }
}
