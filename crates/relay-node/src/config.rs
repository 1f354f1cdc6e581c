//! # Node Configuration
//!
//! Environment-driven configuration for the demo node.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_SERVICE_ADDRESS` | `request_service` | Address the customer-lookup service binds and the client sends to |
//! | `RELAY_REQUEST_TIMEOUT_SECS` | `10` | Per-request deadline |
//! | `RELAY_REPLY_PREFIX` | `reply` | Prefix of the client's reply address |
//! | `RELAY_AUTH_TOKEN` | unset | When set, every request carries `authorization: Bearer <token>` |
//! | `RELAY_MAX_REDELIVERIES` | `2` | Bus redeliveries before dead-lettering |

use relay_request::{ClientConfig, ConfigError, MutatorChain, SetHeader, HEADER_AUTHORIZATION};
use shared_bus::BusConfig;
use shared_types::Address;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Request client configuration (service address, timeout, reply prefix).
    pub client: ClientConfig,
    /// In-memory bus configuration.
    pub bus: BusConfig,
    /// Bearer token injected into every request, if any.
    pub auth_token: Option<String>,
}

impl NodeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env::vars().collect())
    }

    /// Load configuration from an explicit variable map.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(address) = vars.get("RELAY_SERVICE_ADDRESS") {
            config.client.service_address = Address::new(address.trim());
        }
        if let Some(secs) = parse_var::<u64>(&vars, "RELAY_REQUEST_TIMEOUT_SECS")? {
            config.client.request_timeout = Duration::from_secs(secs);
        }
        if let Some(prefix) = vars.get("RELAY_REPLY_PREFIX") {
            config.client.reply_prefix = prefix.trim().to_string();
        }
        if let Some(redeliveries) = parse_var::<u32>(&vars, "RELAY_MAX_REDELIVERIES")? {
            config.bus.max_redeliveries = redeliveries;
        }
        config.auth_token = vars
            .get("RELAY_AUTH_TOKEN")
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        config.client.validate()?;
        Ok(config)
    }

    /// Mutators applied to every outgoing request.
    pub fn mutators(&self) -> MutatorChain {
        let mut chain = MutatorChain::new();
        if let Some(token) = &self.auth_token {
            chain.push(SetHeader::new(HEADER_AUTHORIZATION, format!("Bearer {token}")));
        }
        chain
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    vars.get(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    name,
                    value: value.clone(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}
