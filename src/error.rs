//! Error types for the event client.

use crate::broker::BrokerError;
use thiserror::Error;

/// Main error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client is not configured to be enabled.
    ///
    /// Soft condition: every public operation swallows this into a
    /// successful no-op, so it only surfaces from internal connect calls.
    #[error("client is not configured to be enabled")]
    NotEnabled,

    /// Every connect attempt failed.
    #[error("all retries failed to connect to {url}: {source}")]
    ConnectExhausted {
        url: String,
        #[source]
        source: BrokerError,
    },

    /// The broker rejected a subscribe or queue-subscribe.
    #[error("error subscribing to '{subject}' on cluster '{cluster}': {source}")]
    Subscribe {
        subject: String,
        cluster: String,
        #[source]
        source: BrokerError,
    },

    /// The broker rejected an unsubscribe.
    #[error("unsubscribe {key} failed: {source}")]
    Unsubscribe {
        key: String,
        #[source]
        source: BrokerError,
    },

    /// Unsubscribe referenced a key that is not currently live.
    ///
    /// Covers both keys that were never registered and keys whose entry
    /// was already cleared by a previous unsubscribe.
    #[error("could not find subscription {0} amongst the current subscriptions")]
    UnknownSubscription(String),

    /// Closing the broker connection failed.
    #[error("failed to close broker connection: {0}")]
    Close(#[source] BrokerError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
