use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    pub checkout: CheckoutConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub access_token: String,
    /// Secret for webhook signature verification. Unset skips the check.
    pub webhook_secret: Option<String>,
}

/// Redirect and callback URLs baked into every checkout preference.
#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutConfig {
    pub success_url: String,
    pub failure_url: String,
    pub pending_url: String,
    pub notification_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_materialize_days")]
    pub materialize_days_ahead: i64,
}

fn default_materialize_days() -> i64 {
    60
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of GLACIAR)
            // Eg.. `GLACIAR__SERVER__PORT=8080` would set the server port
            .add_source(config::Environment::with_prefix("GLACIAR").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
