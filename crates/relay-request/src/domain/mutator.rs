//! Envelope mutators applied to outgoing requests.
//!
//! A mutator is a pure `Envelope -> Envelope` transform. The chain is fixed
//! when the client is built and runs in registration order, so on a header
//! collision the later mutator's value wins. Responses never pass through it.

use shared_types::Envelope;
use std::fmt;
use std::sync::Arc;

/// A pure transform over an outgoing request envelope.
///
/// Any `Fn(Envelope) -> Envelope + Send + Sync` closure is a mutator.
pub trait EnvelopeMutator: Send + Sync {
    fn mutate(&self, envelope: Envelope) -> Envelope;
}

impl<F> EnvelopeMutator for F
where
    F: Fn(Envelope) -> Envelope + Send + Sync,
{
    fn mutate(&self, envelope: Envelope) -> Envelope {
        self(envelope)
    }
}

/// Sets one header to a fixed value (e.g. `authorization`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetHeader {
    key: String,
    value: String,
}

impl SetHeader {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl EnvelopeMutator for SetHeader {
    fn mutate(&self, envelope: Envelope) -> Envelope {
        envelope.with_header(self.key.clone(), self.value.clone())
    }
}

/// Ordered list of mutators. An empty chain is the identity.
#[derive(Clone, Default)]
pub struct MutatorChain {
    mutators: Vec<Arc<dyn EnvelopeMutator>>,
}

impl MutatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mutator; it runs after every mutator already in the chain.
    pub fn push(&mut self, mutator: impl EnvelopeMutator + 'static) {
        self.mutators.push(Arc::new(mutator));
    }

    #[must_use]
    pub fn with(mut self, mutator: impl EnvelopeMutator + 'static) -> Self {
        self.push(mutator);
        self
    }

    /// Run every mutator in registration order.
    pub fn apply(&self, envelope: Envelope) -> Envelope {
        self.mutators
            .iter()
            .fold(envelope, |envelope, mutator| mutator.mutate(envelope))
    }

    pub fn len(&self) -> usize {
        self.mutators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutators.is_empty()
    }
}

impl fmt::Debug for MutatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutatorChain")
            .field("len", &self.mutators.len())
            .finish()
    }
}
