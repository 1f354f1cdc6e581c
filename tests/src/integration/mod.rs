//! Cross-crate integration scenarios.

#[cfg(test)]
mod harness;

pub mod correlation;
pub mod e2e;
pub mod failures;
