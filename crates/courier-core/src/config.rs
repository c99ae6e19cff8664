//! Worker configuration read from the process environment.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use envconfig::Envconfig;
use thiserror::Error;

use crate::app::RetryPolicy;
use crate::domain::MessageClassifier;
use crate::domain::classifier::{DEFAULT_ERROR_KINDS, DEFAULT_MARKER};

/// Longest long-poll the queue accepts.
pub const MAX_WAIT_SECONDS: u64 = 20;

/// Startup configuration errors. Any of these stops the process before polling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {0} is empty")]
    Empty(&'static str),

    #[error("could not parse environment variable {0}")]
    Parse(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl From<envconfig::Error> for ConfigError {
    fn from(err: envconfig::Error) -> Self {
        match err {
            envconfig::Error::EnvVarMissing { name } => ConfigError::Missing(name),
            envconfig::Error::ParseError { name } => ConfigError::Parse(name),
        }
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct WorkerConfig {
    /// Record Store identifier.
    #[envconfig(from = "DYNAMODB_TABLE_NAME")]
    pub table_name: String,
    /// Queue identifier.
    #[envconfig(from = "SQS_QUEUE_NAME")]
    pub queue_name: String,
    #[envconfig(from = "WAIT_TIME_SECONDS", default = "10")]
    pub wait_seconds: u64,
    #[envconfig(from = "BACKOFF_BASE_MS", default = "200")]
    pub backoff_base_ms: u64,
    #[envconfig(from = "BACKOFF_MAX_MS", default = "30000")]
    pub backoff_max_ms: u64,
    #[envconfig(from = "BACKOFF_MULTIPLIER", default = "2.0")]
    pub backoff_multiplier: f64,
    #[envconfig(from = "ERROR_MARKER", default = "ERROR:")]
    pub error_marker: String,
    /// Comma-separated whitelist. Empty means the built-in list.
    #[envconfig(from = "ERROR_KINDS", default = "")]
    pub error_kinds: String,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::init_from_env()?.validated()
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::init_from_hashmap(vars)?.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.table_name = self.table_name.trim().to_string();
        self.queue_name = self.queue_name.trim().to_string();
        if self.table_name.is_empty() {
            return Err(ConfigError::Empty("DYNAMODB_TABLE_NAME"));
        }
        if self.queue_name.is_empty() {
            return Err(ConfigError::Empty("SQS_QUEUE_NAME"));
        }
        if self.wait_seconds > MAX_WAIT_SECONDS {
            return Err(ConfigError::Invalid {
                name: "WAIT_TIME_SECONDS",
                reason: format!("must be at most {MAX_WAIT_SECONDS}"),
            });
        }
        if self.backoff_base_ms == 0 || self.backoff_max_ms < self.backoff_base_ms {
            return Err(ConfigError::Invalid {
                name: "BACKOFF_MAX_MS",
                reason: "must be at least BACKOFF_BASE_MS, which must be positive".to_string(),
            });
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                name: "BACKOFF_MULTIPLIER",
                reason: "must be a finite number >= 1.0".to_string(),
            });
        }
        Ok(self)
    }

    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            self.backoff_multiplier,
            Duration::from_millis(self.backoff_max_ms),
        )
    }

    pub fn classifier(&self) -> MessageClassifier {
        let kinds: Vec<&str> = self
            .error_kinds
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect();
        let marker = if self.error_marker.is_empty() {
            DEFAULT_MARKER
        } else {
            self.error_marker.as_str()
        };
        if kinds.is_empty() {
            MessageClassifier::new(marker, DEFAULT_ERROR_KINDS.iter().copied())
        } else {
            MessageClassifier::new(marker, kinds)
        }
    }
}

impl WorkerConfig {
    /// The whitelist the classifier will use, comma-separated.
    pub fn active_error_kinds(&self) -> String {
        self.classifier()
            .recognized_kinds()
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Display for WorkerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DYNAMODB_TABLE_NAME: {}", self.table_name)?;
        writeln!(f, "SQS_QUEUE_NAME: {}", self.queue_name)?;
        writeln!(f, "WAIT_TIME_SECONDS: {}", self.wait_seconds)?;
        writeln!(
            f,
            "BACKOFF: base={}ms max={}ms x{}",
            self.backoff_base_ms, self.backoff_max_ms, self.backoff_multiplier
        )?;
        writeln!(f, "ERROR_MARKER: {}", self.error_marker)?;
        write!(f, "ERROR_KINDS: {}", self.active_error_kinds())
    }
}
