//! # Subscription
//!
//! Handle for a handler bound at an address.

use shared_types::Address;
use std::fmt;
use tracing::debug;

/// A subscription handle for a bound handler.
///
/// When dropped, the address is unbound and the consumer stops receiving
/// deliveries. Transports supply the teardown through [`Subscription::new`].
pub struct Subscription {
    /// The bound address.
    address: Address,

    /// Transport-specific teardown, run exactly once.
    on_drop: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Create a subscription that runs `on_drop` when released.
    pub fn new(address: Address, on_drop: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            address,
            on_drop: Some(Box::new(on_drop)),
        }
    }

    /// The address this subscription is bound at.
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Unbind explicitly. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(on_drop) = self.on_drop.take() {
            on_drop();
        }
        debug!(address = %self.address, "Subscription dropped");
    }
}
