//! Domain types for the request/response layer.
//!
//! Configuration, errors, the pending request registry and envelope
//! mutators. Nothing in here talks to a transport.

pub mod config;
pub mod error;
pub mod mutator;
pub mod pending;

pub use config::{ClientConfig, ConfigError};
pub use error::{ProcessingError, RegistryError, RequestError};
pub use mutator::{EnvelopeMutator, MutatorChain, SetHeader};
pub use pending::{
    cleanup_task, Completion, PendingRequestRegistry, PendingStats, PendingStatsSnapshot,
};
