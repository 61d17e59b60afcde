use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{variable} is not set")]
    Missing { variable: &'static str },
    #[error("{variable} is not a valid port: {value:?}")]
    InvalidPort { variable: &'static str, value: String },
}

/// Worker configuration, read once at startup from `TIX_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub broker: BrokerConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub user: String,
    pub pass: String,
    pub host: String,
    pub port: u16,
    pub queue: String,
}

impl BrokerConfig {
    pub fn amqp_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.user, self.pass, self.host, self.port
        )
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ApiConfig {
    /// Per-installation report endpoint.
    pub fn report_url(&self, user_id: u64, installation_id: u64) -> String {
        let proto = if self.ssl { "https" } else { "http" };
        format!(
            "{proto}://{host}:{port}/api/user/{user_id}/installation/{installation_id}/report",
            host = self.host,
            port = self.port,
        )
    }

    /// Basic-auth credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            broker: BrokerConfig {
                user: var_or("TIX_RABBITMQ_USER", "guest"),
                pass: var_or("TIX_RABBITMQ_PASS", "guest"),
                host: var_or("TIX_RABBITMQ_HOST", "localhost"),
                port: port_or("TIX_RABBITMQ_PORT", 5672)?,
                queue: env::var("TIX_CONDENSER_PROCESSOR_QUEUE").map_err(|_| {
                    ConfigError::Missing {
                        variable: "TIX_CONDENSER_PROCESSOR_QUEUE",
                    }
                })?,
            },
            api: ApiConfig {
                host: var_or("TIX_API_HOST", "localhost"),
                port: port_or("TIX_API_PORT", 80)?,
                ssl: env::var_os("TIX_API_SSL").is_some(),
                user: env::var("TIX_API_USER").ok(),
                password: env::var("TIX_API_PASSWORD").ok(),
            },
        })
    }
}

/// Map `TIX_LOG_LEVEL` onto a tracing filter directive; default INFO.
pub fn log_filter() -> &'static str {
    match env::var("TIX_LOG_LEVEL").ok().as_deref() {
        Some("FATAL") | Some("ERROR") => "error",
        Some("WARN") => "warn",
        Some("DEBUG") => "debug",
        Some("ALL") => "trace",
        _ => "info",
    }
}

fn var_or(variable: &'static str, default: &str) -> String {
    env::var(variable).unwrap_or_else(|_| default.to_string())
}

fn port_or(variable: &'static str, default: u16) -> Result<u16, ConfigError> {
    match env::var(variable) {
        Err(_) => Ok(default),
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidPort {
            variable,
            value,
        }),
    }
}
