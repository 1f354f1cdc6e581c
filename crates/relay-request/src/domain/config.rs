//! Request client configuration with validation.

use crate::{DEFAULT_REPLY_PREFIX, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVICE_ADDRESS};
use shared_types::Address;
use std::time::Duration;
use thiserror::Error;

/// Request client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Where requests are sent
    pub service_address: Address,
    /// Deadline applied to every request that does not override it
    pub request_timeout: Duration,
    /// Prefix of the client's reply address (`<prefix>.<uuid>`)
    pub reply_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_address: Address::new(DEFAULT_SERVICE_ADDRESS),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reply_prefix: DEFAULT_REPLY_PREFIX.to_string(),
        }
    }
}

impl ClientConfig {
    /// Configuration for `service_address` with default timeout and prefix.
    pub fn new(service_address: impl Into<Address>) -> Self {
        Self {
            service_address: service_address.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn with_reply_prefix(mut self, reply_prefix: impl Into<String>) -> Self {
        self.reply_prefix = reply_prefix.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_address.as_str().is_empty() {
            return Err(ConfigError::EmptyServiceAddress);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.reply_prefix.is_empty() {
            return Err(ConfigError::EmptyReplyPrefix);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("service address cannot be empty")]
    EmptyServiceAddress,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("reply prefix cannot be empty")]
    EmptyReplyPrefix,

    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}
