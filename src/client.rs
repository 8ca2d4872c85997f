//! Client facade tying connection lifecycle and registry together.

use crate::broker::{
    BrokerConnection, BrokerConnector, BrokerError, LossHandler, ReconnectFn, Subscriber,
};
use crate::error::{ClientError, Result};
use crate::identity::decorate_client_id;
use crate::logger::{ClientLogger, NullLogger};
use crate::registry::{subscription_key, SubscriptionRegistry};
use crate::retry::{retry_fixed, RetrySpec};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

/// Reserved key accepted by [`Client::unsubscribe`] to clear every live
/// subscription.
pub const UNSUBSCRIBE_ALL: &str = "all";

/// Client configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// A disabled client short-circuits every operation into a silent
    /// no-op without ever contacting the broker.
    #[serde(default)]
    pub enabled: bool,

    /// Retry policy for the initial connect.
    #[serde(default)]
    pub connect_retry: RetrySpec,

    /// Retry policy after a lost connection.
    #[serde(default)]
    pub reconnect_retry: RetrySpec,

    /// Logical identity of this process at the broker.
    #[serde(default)]
    pub client_id: String,

    /// Target broker cluster.
    #[serde(default)]
    pub cluster_id: String,

    /// Broker transport address.
    #[serde(default)]
    pub broker_url: String,
}

/// Construction options not covered by [`ClientConfig`].
#[derive(Default)]
pub struct ClientOptions {
    /// Logging sink. `None` falls back to [`NullLogger`].
    pub logger: Option<Arc<dyn ClientLogger>>,

    /// Append the sanitized local hostname to the client ID so multiple
    /// hosts can share one configured identity.
    pub decorate_identity: bool,

    /// Invoked after a successful reconnect to restore application state.
    /// Without it, a lost connection is fatal.
    pub on_reconnect: Option<ReconnectFn>,
}

/// Connection handle and registry, guarded together by one lock.
#[derive(Default)]
struct ClientState {
    conn: Option<Box<dyn BrokerConnection>>,
    registry: SubscriptionRegistry,
}

struct ClientInner {
    config: ClientConfig,
    client_id: String,
    logger: Arc<dyn ClientLogger>,
    connector: Arc<dyn BrokerConnector>,
    on_reconnect: Option<ReconnectFn>,
    state: Mutex<ClientState>,
    /// Handed to loss handlers so a late callback on a dropped client is a
    /// no-op instead of a resurrection.
    self_ref: Weak<ClientInner>,
}

/// Resilient wrapper around a single logical broker connection.
///
/// Cheap to clone; all clones share the connection and the subscription
/// registry.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.inner.client_id)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client and, when enabled, eagerly connect.
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn BrokerConnector>,
        options: ClientOptions,
    ) -> Result<Self> {
        let ClientOptions {
            logger,
            decorate_identity,
            on_reconnect,
        } = options;

        let logger = logger.unwrap_or_else(|| Arc::new(NullLogger));
        let client_id = if decorate_identity {
            decorate_client_id(&config.client_id)
        } else {
            config.client_id.clone()
        };

        let inner = Arc::new_cyclic(|weak| ClientInner {
            config,
            client_id,
            logger,
            connector,
            on_reconnect,
            state: Mutex::new(ClientState::default()),
            self_ref: weak.clone(),
        });

        if inner.config.enabled {
            let mut state = inner.state.lock();
            inner.connect_locked(&mut state)?;
        }

        Ok(Self { inner })
    }

    /// The identity presented to the broker, after any decoration.
    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    /// Subscribe on the subscriber's subject.
    pub fn subscribe(&self, subscriber: &dyn Subscriber) -> Result<()> {
        self.do_subscribe(subscriber, None)
    }

    /// Subscribe as a member of `queue_group`.
    pub fn queue_subscribe(&self, subscriber: &dyn Subscriber, queue_group: &str) -> Result<()> {
        self.do_subscribe(subscriber, Some(queue_group))
    }

    fn do_subscribe(&self, subscriber: &dyn Subscriber, queue_group: Option<&str>) -> Result<()> {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        match inner.connect_locked(&mut state) {
            Ok(()) => {}
            Err(ClientError::NotEnabled) => return Ok(()),
            Err(err) => return Err(err),
        }

        let ClientState { conn, registry } = &mut *state;
        let Some(conn) = conn.as_deref() else {
            // Disabled clients never hold a connection; nothing to do.
            return Ok(());
        };

        let subject = subscriber.subject();
        let subscribed = match queue_group {
            Some(group) => conn.queue_subscribe(
                subject,
                group,
                subscriber.durable_name(),
                subscriber.message_handler(),
            ),
            None => conn.subscribe(subject, subscriber.durable_name(), subscriber.message_handler()),
        };

        let handle = subscribed.map_err(|source| ClientError::Subscribe {
            subject: subject.to_string(),
            cluster: inner.config.cluster_id.clone(),
            source,
        })?;

        registry.insert(subscription_key(subject, queue_group, subscriber.name()), handle);
        Ok(())
    }

    /// Unsubscribe one key, or every live subscription when `key` is
    /// [`UNSUBSCRIBE_ALL`].
    ///
    /// Unsubscribed keys stay in the registry as tombstones, so a second
    /// unsubscribe of the same key is an [`ClientError::UnknownSubscription`]
    /// error, not a no-op. A bulk unsubscribe aborts on the first broker
    /// failure; entries already cleared stay cleared.
    pub fn unsubscribe(&self, key: &str) -> Result<()> {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        match inner.connect_locked(&mut state) {
            Ok(()) => {}
            Err(ClientError::NotEnabled) => return Ok(()),
            Err(err) => return Err(err),
        }

        if key == UNSUBSCRIBE_ALL {
            for live in state.registry.live_keys() {
                inner.unsubscribe_live(&mut state.registry, &live)?;
            }
            Ok(())
        } else {
            inner.unsubscribe_live(&mut state.registry, key)
        }
    }

    /// Keys of all currently-live subscriptions, in unspecified order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.state.lock().registry.live_keys()
    }

    /// Close the broker connection if one exists.
    ///
    /// Does not unsubscribe and does not clear the registry.
    pub fn close(&self) -> Result<()> {
        let state = self.inner.state.lock();
        if let Some(conn) = state.conn.as_deref() {
            conn.close().map_err(ClientError::Close)?;
        }
        Ok(())
    }
}

impl ClientInner {
    /// Guarded connect protocol. The caller holds the state lock for the
    /// duration, so concurrent callers serialize on the whole attempt.
    fn connect_locked(&self, state: &mut ClientState) -> Result<()> {
        if state.conn.is_some() {
            return Ok(());
        }
        if !self.config.enabled {
            return Err(ClientError::NotEnabled);
        }

        let connected = retry_fixed(
            self.config.connect_retry,
            |attempt, err: &BrokerError| {
                self.logger
                    .info(&format!("connect retry #{attempt} failed with: {err}"));
            },
            || {
                let weak = Weak::clone(&self.self_ref);
                let on_loss: LossHandler = Box::new(move |reason| {
                    if let Some(inner) = weak.upgrade() {
                        inner.handle_connection_lost(reason);
                    }
                });
                self.connector.connect(
                    &self.config.cluster_id,
                    &self.client_id,
                    &self.config.broker_url,
                    on_loss,
                )
            },
        );

        match connected {
            Ok(conn) => {
                state.conn = Some(conn);
                self.logger.info(&format!(
                    "connected to {} cluster_id: [{}] client_id: [{}]",
                    self.config.broker_url, self.config.cluster_id, self.client_id
                ));
                Ok(())
            }
            Err(err) => Err(ClientError::ConnectExhausted {
                url: self.config.broker_url.clone(),
                source: err
                    .into_last()
                    .unwrap_or_else(|| BrokerError::new("retry policy allows no attempts")),
            }),
        }
    }

    /// Invoked by the broker on its own execution context when the
    /// connection drops. Races with application calls only through the
    /// state lock.
    fn handle_connection_lost(&self, reason: BrokerError) {
        self.logger.info("connection lost to streaming broker");

        if self.on_reconnect.is_none() {
            self.logger
                .fatal(&format!("connection lost, reason: {reason}"));
        }

        // The lock is released before the reconnect callback runs: the
        // callback is expected to call back into the client (re-subscribe,
        // re-hydrate) and would otherwise deadlock.
        {
            let mut state = self.state.lock();
            state.conn = None;

            let reconnected = retry_fixed(
                self.config.reconnect_retry,
                |attempt, err: &ClientError| {
                    self.logger
                        .info(&format!("reconnection try #{attempt} failed with: {err}"));
                },
                || {
                    self.connect_locked(&mut state)?;
                    self.logger.info("successfully reconnected to streaming broker");
                    Ok(())
                },
            );

            if let Err(err) = reconnected {
                self.logger.fatal(&format!(
                    "all attempts to reconnect to the streaming broker failed: {err}"
                ));
            }
        }

        if let Some(on_reconnect) = &self.on_reconnect {
            if let Err(err) = on_reconnect() {
                self.logger
                    .fatal(&format!("reconnect callback failed: {err}"));
            }
        }
    }

    fn unsubscribe_live(&self, registry: &mut SubscriptionRegistry, key: &str) -> Result<()> {
        let Some(handle) = registry.take_live(key) else {
            return Err(ClientError::UnknownSubscription(key.to_string()));
        };

        if let Err(source) = handle.unsubscribe() {
            // Broker failure leaves the entry live.
            registry.restore(key.to_string(), handle);
            return Err(ClientError::Unsubscribe {
                key: key.to_string(),
                source,
            });
        }

        self.logger
            .info(&format!("successfully unsubscribed subscriber {key}"));
        Ok(())
    }
}
