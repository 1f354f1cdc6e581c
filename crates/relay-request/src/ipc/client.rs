//! Request client: send a request, await the correlated response.

use crate::domain::config::ClientConfig;
use crate::domain::error::RequestError;
use crate::domain::mutator::{EnvelopeMutator, MutatorChain};
use crate::domain::pending::{Completion, PendingRequestRegistry};
use crate::ipc::reply::ReplyEndpoint;
use relay_telemetry::metrics::outcome;
use relay_telemetry::{metric_inc, record_outcome, REQUESTS_SENT};
use shared_bus::{MessageTransport, TransportError};
use shared_types::{now_millis, Address, CorrelationId, Envelope, Message};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, OnceCell};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, field, info_span, warn, Instrument, Span};

/// Far-future fallback for deadlines that would overflow `Instant`.
const MAX_DEADLINE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Typed request/response client for one service address.
///
/// Any number of requests may be outstanding at once. The reply endpoint is
/// resolved on first use and shared by every request of this client; dropping
/// the client unbinds it.
pub struct RequestClient<Req, Resp> {
    transport: Arc<dyn MessageTransport>,
    config: ClientConfig,
    registry: Arc<PendingRequestRegistry>,
    reply_endpoint: OnceCell<ReplyEndpoint>,
    mutators: MutatorChain,
    _messages: PhantomData<fn(Req) -> Resp>,
}

impl<Req: Message, Resp: Message> RequestClient<Req, Resp> {
    pub fn new(transport: Arc<dyn MessageTransport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            registry: Arc::new(PendingRequestRegistry::new()),
            reply_endpoint: OnceCell::new(),
            mutators: MutatorChain::new(),
            _messages: PhantomData,
        }
    }

    /// Replace the mutator chain applied to outgoing requests.
    #[must_use]
    pub fn with_mutators(mut self, mutators: MutatorChain) -> Self {
        self.mutators = mutators;
        self
    }

    /// Append one mutator to the chain.
    #[must_use]
    pub fn with_mutator(mut self, mutator: impl EnvelopeMutator + 'static) -> Self {
        self.mutators.push(mutator);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The registry shared by this client's requests and its reply listener.
    pub fn registry(&self) -> &Arc<PendingRequestRegistry> {
        &self.registry
    }

    /// Get pending request count
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// The reply address, once resolved.
    pub fn reply_address(&self) -> Option<&Address> {
        self.reply_endpoint.get().map(ReplyEndpoint::address)
    }

    /// Send `payload` and wait for the response, bounded by the configured
    /// timeout and `cancel`.
    pub async fn request(
        &self,
        payload: &Req,
        cancel: &CancellationToken,
    ) -> Result<Resp, RequestError> {
        self.request_with_timeout(payload, self.config.request_timeout, cancel)
            .await
    }

    /// Like [`request`](Self::request) with a per-call timeout.
    ///
    /// Exactly one outcome is returned: the response, `Transport`, `Timeout`
    /// or `Cancelled`. Dropping the returned future removes the pending entry.
    pub async fn request_with_timeout(
        &self,
        payload: &Req,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Resp, RequestError> {
        let span = info_span!(
            "request",
            service = %self.config.service_address,
            message_type = Req::MESSAGE_TYPE,
            correlation_id = field::Empty
        );
        let started = Instant::now();

        let result = self.execute(payload, timeout, cancel).instrument(span).await;

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(_) => record_outcome(outcome::SUCCESS, elapsed),
            Err(e) => record_outcome(e.outcome(), elapsed),
        }
        result
    }

    /// Resolve the reply endpoint once; concurrent first callers share one
    /// resolution. A failure is not cached.
    async fn resolve_reply_address(&self) -> Result<&Address, TransportError> {
        let endpoint = self
            .reply_endpoint
            .get_or_try_init(|| {
                ReplyEndpoint::resolve(
                    self.transport.as_ref(),
                    &self.config.reply_prefix,
                    self.registry.clone(),
                )
            })
            .await?;
        Ok(endpoint.address())
    }

    /// Insert under a fresh id, regenerating on the (negligible) chance of a
    /// collision with a live entry.
    fn register(&self, deadline: Instant) -> (CorrelationId, oneshot::Receiver<Completion>) {
        loop {
            let correlation_id = CorrelationId::new();
            match self.registry.insert(correlation_id, deadline) {
                Ok(completion) => return (correlation_id, completion),
                Err(e) => warn!(error = %e, "Correlation id collision, regenerating"),
            }
        }
    }

    async fn execute(
        &self,
        payload: &Req,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Resp, RequestError> {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + MAX_DEADLINE);

        // The deadline covers every suspension point, resolution included
        let reply_to = tokio::select! {
            biased;
            resolved = self.resolve_reply_address() => resolved?.clone(),
            () = tokio::time::sleep_until(deadline) => {
                warn!("Reply endpoint not resolved before deadline");
                return Err(RequestError::Timeout { timeout });
            }
            () = cancel.cancelled() => return Err(RequestError::Cancelled),
        };

        // Registered before send so a fast response always finds its entry
        let (correlation_id, mut completion) = self.register(deadline);
        let _guard = PendingGuard {
            registry: &self.registry,
            correlation_id,
        };
        Span::current().record("correlation_id", field::display(correlation_id));

        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let envelope = Envelope::encode(payload, correlation_id)?
            .with_reply_to(reply_to)
            .with_expires_at(now_millis().saturating_add(timeout_ms));
        let envelope = self.mutators.apply(envelope);

        // A full destination queue must not hold the caller past its deadline
        let sent = tokio::select! {
            biased;
            sent = self.transport.send(envelope, &self.config.service_address) => sent,
            () = tokio::time::sleep_until(deadline) => {
                self.registry.expire(correlation_id);
                warn!("Request send blocked past deadline");
                return Err(RequestError::Timeout { timeout });
            }
            () = cancel.cancelled() => {
                self.registry.cancel(correlation_id);
                return Err(RequestError::Cancelled);
            }
        };
        if let Err(e) = sent {
            self.registry.remove(&correlation_id);
            warn!(error = %e, "Request send failed");
            return Err(e.into());
        }
        metric_inc!(REQUESTS_SENT);
        debug!(timeout_ms = timeout_ms, "Request sent");

        // Whichever branch fires first retires the entry; the outcome is
        // always read from the completion handle, so a response that slipped
        // in just before expire/cancel still wins.
        let result = tokio::select! {
            biased;
            result = &mut completion => result,
            () = tokio::time::sleep_until(deadline) => {
                self.registry.expire(correlation_id);
                completion.await
            }
            () = cancel.cancelled() => {
                self.registry.cancel(correlation_id);
                completion.await
            }
        };

        match result {
            Ok(Completion::Response(envelope)) => {
                debug!("Response received");
                Ok(envelope.decode::<Resp>()?)
            }
            Ok(Completion::Expired) => Err(RequestError::Timeout { timeout }),
            Ok(Completion::Cancelled) => Err(RequestError::Cancelled),
            Err(_) => {
                // Entry was removed from outside without a signal
                warn!("Pending request dropped without completion");
                Err(RequestError::Cancelled)
            }
        }
    }
}

impl<Req, Resp> fmt::Debug for RequestClient<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient")
            .field("config", &self.config)
            .field("reply_address", &self.reply_endpoint.get().map(ReplyEndpoint::address))
            .field("pending", &self.registry.len())
            .field("mutators", &self.mutators)
            .finish()
    }
}

/// Removes the pending entry when a request future ends, however it ends.
struct PendingGuard<'a> {
    registry: &'a PendingRequestRegistry,
    correlation_id: CorrelationId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.registry.remove(&self.correlation_id) {
            debug!(
                correlation_id = %self.correlation_id,
                "Request abandoned, pending entry removed"
            );
        }
    }
}
