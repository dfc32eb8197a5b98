use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Active (PENDING/APPROVED) reservations a vendor may hold per fair.
    #[serde(default = "default_capacity")]
    pub max_active_per_fair: i64,
    /// Deadline for a cross-service reply before the caller gets a 408.
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_ms: u64,
    #[serde(default = "default_outbox_poll")]
    pub outbox_poll_ms: u64,
    #[serde(default = "default_outbox_batch")]
    pub outbox_batch: i64,
    pub rate_limit_per_minute: Option<i64>,
}

fn default_capacity() -> i64 { 3 }
fn default_reply_timeout() -> u64 { 5000 }
fn default_outbox_poll() -> u64 { 1000 }
fn default_outbox_batch() -> i64 { 32 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
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
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub group_id: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `STALLBOOK__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("STALLBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
