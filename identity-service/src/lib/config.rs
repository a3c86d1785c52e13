use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub token: TokenConfig,
    pub mail: MailConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    /// Signing key, required; startup fails without it.
    pub secret: String,
    #[serde(default = "TokenConfig::default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    #[serde(default = "TokenConfig::default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
}

impl TokenConfig {
    fn default_access_ttl_minutes() -> i64 {
        30
    }

    fn default_refresh_ttl_days() -> i64 {
        14
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub host: String,
    #[serde(default = "MailConfig::default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address placed on outbound verification mail.
    pub from: String,
}

impl MailConfig {
    fn default_port() -> u16 {
        587
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    #[serde(default = "VerificationConfig::default_code_length")]
    pub code_length: usize,
    #[serde(default = "VerificationConfig::default_ttl_minutes")]
    pub ttl_minutes: i64,
}

impl VerificationConfig {
    fn default_code_length() -> usize {
        6
    }

    fn default_ttl_minutes() -> i64 {
        5
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_length: Self::default_code_length(),
            ttl_minutes: Self::default_ttl_minutes(),
        }
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, TOKEN__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: TOKEN__SECRET=... overrides token.secret
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }
}
