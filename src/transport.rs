//! Cross-context request/response transport.
//!
//! Each call is its own ephemeral exchange: one [`Request`] out, at most one [`Response`]
//! back. The receiving context holds a [`Responder`] for every call it accepts; the call
//! stays open until that responder is used, so handlers may reply after any amount of
//! asynchronous work. Dropping a responder without replying closes the call.

use crate::config::TransportConfig;
use crate::error::{ChannelError, TransportError};
use crate::protocol::{OperationKind, Request, Response};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// One delivery attempt to another context
#[async_trait]
pub trait Channel: Send + Sync {
    async fn deliver(&self, request: Request) -> Result<Response, ChannelError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub response_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

impl From<&TransportConfig> for RetryPolicy {
    fn from(config: &TransportConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.retry_backoff(),
            response_timeout: config.response_timeout(),
        }
    }
}

/// Sender side of the protocol
#[derive(Clone)]
pub struct Transport {
    channel: Arc<dyn Channel>,
    policy: RetryPolicy,
}

impl Transport {
    pub fn new(channel: Arc<dyn Channel>, policy: RetryPolicy) -> Self {
        Self { channel, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request` and wait for its reply.
    ///
    /// Context invalidation is retried up to `max_attempts` with a fixed backoff. Every
    /// other failure, and a reply that does not arrive within `response_timeout`, is
    /// terminal.
    pub async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let kind = request.kind();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(%kind, attempt, "Sending to background");

            match self.attempt(request.clone(), kind).await? {
                Ok(response) => {
                    debug!(%kind, success = response.success, "Response from background");
                    return Ok(response);
                }
                Err(ChannelError::ContextInvalidated) if attempt < self.policy.max_attempts => {
                    warn!(
                        %kind,
                        attempt,
                        backoff_ms = self.policy.backoff.as_millis() as u64,
                        "Receiving context invalidated, retrying"
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(ChannelError::ContextInvalidated) => {
                    warn!(%kind, attempts = attempt, "Receiving context invalidated, giving up");
                    return Err(TransportError::ContextInvalidated { attempts: attempt });
                }
                Err(ChannelError::Closed) => {
                    warn!(%kind, "Message port closed before a response was received");
                    return Err(TransportError::Closed);
                }
                Err(ChannelError::Receiver(message)) => {
                    warn!(%kind, error = %message, "Receiving context failed");
                    return Err(TransportError::Receiver(message));
                }
            }
        }
    }

    async fn attempt(
        &self,
        request: Request,
        kind: OperationKind,
    ) -> Result<Result<Response, ChannelError>, TransportError> {
        let delivery = self.channel.deliver(request);
        match self.policy.response_timeout {
            Some(limit) => tokio::time::timeout(limit, delivery).await.map_err(|_| {
                warn!(%kind, timeout_ms = limit.as_millis() as u64, "No response from background");
                TransportError::Timeout(limit)
            }),
            None => Ok(delivery.await),
        }
    }
}

/// Reply handle for one accepted call; consumed by the single reply.
#[derive(Debug)]
pub struct Responder {
    sender: oneshot::Sender<Result<Response, String>>,
}

impl Responder {
    /// Returns false when the caller stopped waiting.
    pub fn respond(self, response: Response) -> bool {
        self.sender.send(Ok(response)).is_ok()
    }

    /// Fail the call from the receiving side.
    pub fn reject(self, message: impl Into<String>) -> bool {
        self.sender.send(Err(message.into())).is_ok()
    }
}

/// A call as seen by the receiving context
#[derive(Debug)]
pub struct Inbound {
    pub request: Request,
    pub responder: Responder,
}

/// In-process channel into a receiving context
#[derive(Clone)]
pub struct ContextChannel {
    sender: mpsc::Sender<Inbound>,
}

/// Receiving end of a [`ContextChannel`]; dropping it invalidates the context.
pub struct Inbox {
    receiver: mpsc::Receiver<Inbound>,
}

impl Inbox {
    pub async fn recv(&mut self) -> Option<Inbound> {
        self.receiver.recv().await
    }
}

/// Create a connected channel/inbox pair with room for `buffer` pending calls.
pub fn context_channel(buffer: usize) -> (ContextChannel, Inbox) {
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    (ContextChannel { sender }, Inbox { receiver })
}

#[async_trait]
impl Channel for ContextChannel {
    async fn deliver(&self, request: Request) -> Result<Response, ChannelError> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(Inbound {
                request,
                responder: Responder { sender },
            })
            .await
            .map_err(|_| ChannelError::ContextInvalidated)?;

        match receiver.await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(message)) => Err(ChannelError::Receiver(message)),
            Err(_) => Err(ChannelError::Closed),
        }
    }
}
