//! # Event Client
//!
//! A resilient client wrapper around a streaming pub/sub broker connection.
//!
//! ## Core Concepts
//!
//! - **One logical connection**: established lazily or at construction,
//!   guarded by a single lock
//! - **Bounded retry**: initial connect and reconnect-after-loss each follow
//!   their own fixed-delay policy
//! - **Subscription registry**: point-to-point and queue-group
//!   subscriptions under composite keys, with tombstones instead of deletion
//! - **Connected or dead**: exhausting reconnect attempts escalates through
//!   the logger's fatal path rather than running disconnected
//!
//! ## Example
//!
//! ```ignore
//! use eventclient::{Client, ClientConfig, ClientOptions};
//!
//! let client = Client::new(
//!     ClientConfig {
//!         enabled: true,
//!         client_id: "billing".into(),
//!         cluster_id: "prod".into(),
//!         broker_url: "nats://localhost:4222".into(),
//!         ..Default::default()
//!     },
//!     connector, // any Arc<dyn BrokerConnector>
//!     ClientOptions::default(),
//! )?;
//!
//! client.subscribe(&order_subscriber)?;
//! client.unsubscribe("orders-billing")?;
//! ```

pub mod broker;
pub mod client;
pub mod error;
pub mod identity;
pub mod logger;
pub mod registry;
pub mod retry;

// Re-exports
pub use broker::{
    BrokerConnection, BrokerConnector, BrokerError, BrokerSubscription, LossHandler,
    MessageHandler, ReconnectFn, Subscriber,
};
pub use client::{Client, ClientConfig, ClientOptions, UNSUBSCRIBE_ALL};
pub use error::{ClientError, Result};
pub use identity::decorate_client_id;
pub use logger::{ClientLogger, NullLogger, TracingLogger};
pub use registry::{subscription_key, SubscriptionRegistry};
pub use retry::{retry_fixed, RetryError, RetrySpec};
