//! Layered runtime configuration.
//!
//! Values are merged in order, later sources winning:
//!
//! 1. compiled defaults
//! 2. an optional TOML file
//! 3. `TASKLINK_*` environment variables, where the first `_` after the
//!    section name separates section and key (`TASKLINK_QUEUE_MAX_ATTEMPTS`
//!    sets `queue.max_attempts`)

use crate::notification::services::DispatchSettings;
use crate::pipeline::SyncSettings;
use crate::queue::{
    domain::{BackoffPolicy, QueueSettings},
    services::WorkerPoolConfig,
};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "TASKLINK_";
const SECTIONS: [&str; 7] = [
    "server",
    "database",
    "queue",
    "pipeline",
    "platform",
    "notification",
    "log",
];

/// Configuration could not be assembled.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or a value did not parse.
    #[error("invalid configuration: {0}")]
    Invalid(Box<figment::Error>),
    /// The message retry budget does not fit inside the queue's.
    #[error(
        "pipeline.max_message_attempts ({message}) must be between 1 and queue.max_attempts ({queue})"
    )]
    RetryBudget {
        /// Configured `pipeline.max_message_attempts`.
        message: u32,
        /// Configured `queue.max_attempts`.
        queue: u32,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(Box::new(err))
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// `PostgreSQL` connection pool.
    pub database: DatabaseConfig,
    /// Work queue and worker pool.
    pub queue: QueueConfig,
    /// Message processing.
    pub pipeline: PipelineConfig,
    /// Outbound messaging API.
    pub platform: PlatformConfig,
    /// Notification delivery.
    pub notification: NotificationConfig,
    /// Logging.
    pub log: LogConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind_address: String,
    /// Largest accepted webhook body.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_owned(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/tasklink".to_owned(),
            pool_size: 10,
        }
    }
}

/// Queue and worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QueueConfig {
    /// Concurrent workers.
    pub workers: usize,
    /// Idle poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Claim lease in seconds.
    pub lease_secs: i64,
    /// Claims allowed per job.
    pub max_attempts: u32,
    /// First retry delay in seconds.
    pub backoff_base_secs: u64,
    /// Longest retry delay in seconds.
    pub backoff_cap_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_interval_ms: 500,
            lease_secs: 60,
            max_attempts: 5,
            backoff_base_secs: 5,
            backoff_cap_secs: 300,
        }
    }
}

impl QueueConfig {
    /// Lease and retry rules for queue adapters.
    #[must_use]
    pub fn settings(&self) -> QueueSettings {
        QueueSettings {
            lease: chrono::Duration::seconds(self.lease_secs),
            max_attempts: self.max_attempts,
            backoff: BackoffPolicy::new(
                Duration::from_secs(self.backoff_base_secs),
                Duration::from_secs(self.backoff_cap_secs),
            ),
        }
    }

    /// Worker pool sizing.
    #[must_use]
    pub const fn worker_pool(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            workers: self.workers,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Message processing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PipelineConfig {
    /// Failed attempts before a message is flagged for inspection.
    pub max_message_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_message_attempts: SyncSettings::default().max_message_attempts,
        }
    }
}

impl PipelineConfig {
    /// Retry budget for the message synchronizer.
    #[must_use]
    pub const fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            max_message_attempts: self.max_message_attempts,
        }
    }
}

/// Outbound messaging API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PlatformConfig {
    /// Base URL of the messaging API.
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.line.me".to_owned(),
            request_timeout_secs: 10,
        }
    }
}

impl PlatformConfig {
    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Notification delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NotificationConfig {
    /// Push attempts per recipient.
    pub max_send_attempts: u32,
    /// First resend delay in milliseconds.
    pub backoff_base_ms: u64,
    /// Longest resend delay in milliseconds.
    pub backoff_cap_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_send_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 30_000,
        }
    }
}

impl NotificationConfig {
    /// Retry rules for the dispatcher.
    #[must_use]
    pub const fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            max_attempts: self.max_send_attempts,
            backoff: BackoffPolicy::new(
                Duration::from_millis(self.backoff_base_ms),
                Duration::from_millis(self.backoff_cap_ms),
            ),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "tasklink=info,tower_http=info,warn".to_owned(),
        }
    }
}

impl AppConfig {
    /// Builds the layered provider without extracting it.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let base = Figment::new().merge(Serialized::defaults(Self::default()));
        let with_file = match path {
            Some(file) => base.merge(Toml::file(file)),
            None => base,
        };
        with_file.merge(env_provider())
    }

    /// Loads defaults, the optional file and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value has the wrong type or a key is
    /// unknown, or when the retry budgets disagree.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::figment(path).extract::<Self>()?.validated()
    }

    /// Parses TOML on top of the defaults, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the TOML is invalid, names unknown keys,
    /// or sets retry budgets that disagree.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml))
            .extract::<Self>()?
            .validated()
    }

    /// A message is flagged no later than the queue's final claim of it.
    fn validated(self) -> Result<Self, ConfigError> {
        let message = self.pipeline.max_message_attempts;
        let queue = self.queue.max_attempts;
        if message == 0 || message > queue {
            return Err(ConfigError::RetryBudget { message, queue });
        }
        Ok(self)
    }
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| env_key(key.as_str()).into())
}

/// Maps `queue_max_attempts` to `queue.max_attempts`. Keys outside a known
/// section are passed through and rejected by `deny_unknown_fields`.
fn env_key(raw: &str) -> String {
    SECTIONS
        .iter()
        .find_map(|section| {
            raw.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or_else(|| raw.to_owned())
}
