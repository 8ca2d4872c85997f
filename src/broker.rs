//! Collaborator traits for the broker transport.
//!
//! The client never speaks a wire protocol itself. Everything that touches
//! the network lives behind these traits, supplied by the embedding
//! application (a NATS-Streaming binding in production, an in-memory broker
//! in tests).

use std::sync::Arc;
use thiserror::Error;

/// Error reported by the broker transport.
///
/// Opaque on purpose: the client only relays broker failures, it never
/// inspects them.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct BrokerError {
    message: String,
}

impl BrokerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Callback invoked with each message delivered on a subscription.
///
/// Runs on the broker's own dispatch context, outside the client's lock.
pub type MessageHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Callback installed on a connection, invoked at most once if that
/// connection is lost. Runs on the broker's own execution context.
pub type LossHandler = Box<dyn FnOnce(BrokerError) + Send>;

/// Application callback run after a successful reconnect to restore state
/// (re-establish subscriptions, re-hydrate caches). Failure is treated as
/// unrecoverable.
pub type ReconnectFn =
    Box<dyn Fn() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Opens connections to the broker.
pub trait BrokerConnector: Send + Sync {
    /// Open a single connection, installing `on_connection_lost` to fire if
    /// the connection later drops.
    fn connect(
        &self,
        cluster_id: &str,
        client_id: &str,
        url: &str,
        on_connection_lost: LossHandler,
    ) -> std::result::Result<Box<dyn BrokerConnection>, BrokerError>;
}

/// A live connection to the broker.
pub trait BrokerConnection: Send + Sync {
    /// Subscribe to a subject. The durable name may be empty for
    /// non-durable subscriptions.
    fn subscribe(
        &self,
        subject: &str,
        durable_name: &str,
        handler: MessageHandler,
    ) -> std::result::Result<Box<dyn BrokerSubscription>, BrokerError>;

    /// Subscribe as a member of a queue group: the broker distributes each
    /// message to one live member of the group.
    fn queue_subscribe(
        &self,
        subject: &str,
        queue_group: &str,
        durable_name: &str,
        handler: MessageHandler,
    ) -> std::result::Result<Box<dyn BrokerSubscription>, BrokerError>;

    /// Publish a payload to a subject.
    fn publish(&self, subject: &str, payload: &[u8]) -> std::result::Result<(), BrokerError>;

    /// Close the connection.
    fn close(&self) -> std::result::Result<(), BrokerError>;
}

/// Handle to a single live subscription.
pub trait BrokerSubscription: Send + Sync {
    /// Remove the subscription at the broker.
    fn unsubscribe(&self) -> std::result::Result<(), BrokerError>;
}

/// Everything the subscribe operations need from the application.
pub trait Subscriber: Send + Sync {
    /// Subject to subscribe on.
    fn subject(&self) -> &str;

    /// Broker-side persistence key; empty for non-durable subscriptions.
    fn durable_name(&self) -> &str;

    /// Name distinguishing this subscriber from others on the same subject.
    fn name(&self) -> &str;

    /// Handler invoked with each delivered payload.
    fn message_handler(&self) -> MessageHandler;
}
