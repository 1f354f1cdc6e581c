//! # In-Memory Bus
//!
//! Addressed, single-process implementation of [`MessageTransport`].
//!
//! Each bound address owns a bounded `tokio::sync::mpsc` queue and a
//! consumer task. Suitable for tests and single-node operation; distributed
//! deployments would plug a broker-backed transport in behind the same trait.

use crate::subscriber::Subscription;
use crate::transport::{HandlerError, MessageHandler, MessageTransport, TransportError};
use crate::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEAD_LETTER_LIMIT, DEFAULT_MAX_REDELIVERIES,
    DEFAULT_PREFETCH, DLQ_ADDRESS, HEADER_DEAD_LETTER_ADDRESS, HEADER_DEAD_LETTER_REASON,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{now_millis, Address, Envelope};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, warn};

/// Bus tuning knobs.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Queue capacity per bound address.
    pub channel_capacity: usize,
    /// Maximum concurrent handler invocations per bound address.
    pub prefetch: usize,
    /// Redeliveries after a handler failure before dead-lettering.
    pub max_redeliveries: u32,
    /// Dead letters kept in the in-memory log; the oldest are evicted first.
    pub dead_letter_limit: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            prefetch: DEFAULT_PREFETCH,
            max_redeliveries: DEFAULT_MAX_REDELIVERIES,
            dead_letter_limit: DEFAULT_DEAD_LETTER_LIMIT,
        }
    }
}

/// A delivery that failed on every allowed attempt.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// The envelope as originally sent.
    pub envelope: Envelope,
    /// The address it was sent to.
    pub address: Address,
    /// Display form of the last handler error.
    pub reason: String,
    /// Number of handler invocations made.
    pub attempts: u32,
    /// When it was dead-lettered (unix millis).
    pub failed_at: u64,
}

struct Route {
    id: u64,
    sender: mpsc::Sender<Envelope>,
}

struct BusInner {
    config: BusConfig,
    routes: RwLock<HashMap<Address, Route>>,
    dead_letters: Mutex<VecDeque<DeadLetter>>,
    closed: AtomicBool,
    next_route_id: AtomicU64,
    messages_sent: AtomicU64,
    messages_delivered: AtomicU64,
    messages_dead_lettered: AtomicU64,
}

impl BusInner {
    fn unbind(&self, address: &Address, route_id: u64) {
        let mut routes = self.routes.write();
        // Only remove the route this subscription created.
        if routes.get(address).is_some_and(|route| route.id == route_id) {
            routes.remove(address);
            debug!(address = %address, "Address unbound");
        }
    }

    fn route_sender(&self, address: &Address) -> Option<mpsc::Sender<Envelope>> {
        self.routes
            .read()
            .get(address)
            .map(|route| route.sender.clone())
    }

    async fn deliver(&self, address: &Address, envelope: Envelope, handler: &dyn MessageHandler) {
        let max_attempts = self.config.max_redeliveries.saturating_add(1);
        let mut attempt: u32 = 1;

        loop {
            match handler.handle(envelope.clone()).await {
                Ok(()) => {
                    self.messages_delivered.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        address = %address,
                        message_id = %envelope.message_id(),
                        attempt = attempt,
                        error = %e,
                        "Handler failed, redelivering"
                    );
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => {
                    self.dead_letter(address, envelope, &e, attempt);
                    return;
                }
            }
        }
    }

    fn dead_letter(&self, address: &Address, envelope: Envelope, reason: &HandlerError, attempts: u32) {
        error!(
            address = %address,
            message_id = %envelope.message_id(),
            correlation_id = %envelope.correlation_id(),
            attempts = attempts,
            error = %reason,
            "Delivery failed, moving to dead-letter queue"
        );

        self.messages_dead_lettered.fetch_add(1, Ordering::Relaxed);
        {
            let mut log = self.dead_letters.lock();
            if self.config.dead_letter_limit == 0 {
                log.clear();
            } else {
                while log.len() >= self.config.dead_letter_limit {
                    log.pop_front();
                }
                log.push_back(DeadLetter {
                    envelope: envelope.clone(),
                    address: address.clone(),
                    reason: reason.to_string(),
                    attempts,
                    failed_at: now_millis(),
                });
            }
        }

        let dlq = Address::new(DLQ_ADDRESS);
        if *address == dlq {
            return;
        }
        if let Some(sender) = self.route_sender(&dlq) {
            let forwarded = envelope
                .with_header(HEADER_DEAD_LETTER_ADDRESS, address.as_str())
                .with_header(HEADER_DEAD_LETTER_REASON, reason.to_string());
            if sender.try_send(forwarded).is_err() {
                warn!(address = %address, "Dead-letter queue full or closed, envelope kept in log only");
            }
        }
    }
}

/// In-memory implementation of the addressed bus.
///
/// Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct InMemoryBus {
    inner: Arc<BusInner>,
}

impl InMemoryBus {
    /// Create a new in-memory bus with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a new in-memory bus with the given configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                routes: RwLock::new(HashMap::new()),
                dead_letters: Mutex::new(VecDeque::new()),
                closed: AtomicBool::new(false),
                next_route_id: AtomicU64::new(0),
                messages_sent: AtomicU64::new(0),
                messages_delivered: AtomicU64::new(0),
                messages_dead_lettered: AtomicU64::new(0),
            }),
        }
    }

    /// Whether a handler is currently bound at `address`.
    #[must_use]
    pub fn is_bound(&self, address: &Address) -> bool {
        self.inner.routes.read().contains_key(address)
    }

    /// Number of bound addresses.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.routes.read().len()
    }

    /// Total envelopes accepted by `send`.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.inner.messages_sent.load(Ordering::Relaxed)
    }

    /// Total deliveries a handler acknowledged.
    #[must_use]
    pub fn messages_delivered(&self) -> u64 {
        self.inner.messages_delivered.load(Ordering::Relaxed)
    }

    /// Total envelopes moved to the dead-letter queue.
    #[must_use]
    pub fn messages_dead_lettered(&self) -> u64 {
        self.inner.messages_dead_lettered.load(Ordering::Relaxed)
    }

    /// Snapshot of the dead-letter log.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.dead_letters.lock().iter().cloned().collect()
    }

    /// Get the bus configuration.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Unbind every address and reject further sends and subscriptions.
    ///
    /// Deliveries already handed to a handler run to completion.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let unbound = {
            let mut routes = self.inner.routes.write();
            let count = routes.len();
            routes.clear();
            count
        };
        debug!(unbound = unbound, "Bus shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageTransport for InMemoryBus {
    async fn send(&self, envelope: Envelope, destination: &Address) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let sender = self
            .inner
            .route_sender(destination)
            .ok_or_else(|| TransportError::Unroutable {
                address: destination.clone(),
            })?;

        let message_id = envelope.message_id();
        let correlation_id = envelope.correlation_id();

        // The consumer may have been dropped between lookup and send.
        sender
            .send(envelope)
            .await
            .map_err(|_| TransportError::Unroutable {
                address: destination.clone(),
            })?;

        self.inner.messages_sent.fetch_add(1, Ordering::Relaxed);
        debug!(
            address = %destination,
            message_id = %message_id,
            correlation_id = %correlation_id,
            "Envelope sent"
        );
        Ok(())
    }

    async fn subscribe(
        &self,
        address: &Address,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Subscription, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let (sender, receiver) = mpsc::channel(self.inner.config.channel_capacity.max(1));
        let route_id = self.inner.next_route_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut routes = self.inner.routes.write();
            if routes.contains_key(address) {
                return Err(TransportError::AddressInUse {
                    address: address.clone(),
                });
            }
            routes.insert(
                address.clone(),
                Route {
                    id: route_id,
                    sender,
                },
            );
        }

        let consumer = tokio::spawn(consume(
            Arc::downgrade(&self.inner),
            address.clone(),
            receiver,
            handler,
            self.inner.config.prefetch.max(1),
        ));

        debug!(address = %address, "Address bound");

        let weak = Arc::downgrade(&self.inner);
        let bound = address.clone();
        Ok(Subscription::new(address.clone(), move || {
            if let Some(inner) = weak.upgrade() {
                inner.unbind(&bound, route_id);
            }
            consumer.abort();
        }))
    }
}

/// Consumer loop for one bound address.
///
/// Each delivery runs in its own task; at most `prefetch` run concurrently.
async fn consume(
    bus: Weak<BusInner>,
    address: Address,
    mut receiver: mpsc::Receiver<Envelope>,
    handler: Arc<dyn MessageHandler>,
    prefetch: usize,
) {
    let permits = Arc::new(Semaphore::new(prefetch));

    while let Some(envelope) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let Some(inner) = bus.upgrade() else {
            break;
        };
        let handler = handler.clone();
        let address = address.clone();

        tokio::spawn(async move {
            inner.deliver(&address, envelope, handler.as_ref()).await;
            drop(permit);
        });
    }

    debug!(address = %address, "Consumer stopped");
}
