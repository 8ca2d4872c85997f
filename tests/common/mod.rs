//! In-memory broker and test doubles for the integration suite.

use crossbeam_channel::{unbounded, Receiver, Sender};
use eventclient::{
    BrokerConnection, BrokerConnector, BrokerError, BrokerSubscription, ClientLogger, LossHandler,
    MessageHandler, Subscriber,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

/// An in-process broker implementing the client's collaborator traits,
/// with knobs for injecting connect failures, unsubscribe failures, and
/// connection loss.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

#[derive(Default)]
struct BrokerInner {
    state: Mutex<BrokerState>,
    connect_attempts: AtomicU32,
    connect_failures: AtomicU32,
    fail_next_unsubscribe: AtomicBool,
    next_id: AtomicU64,
}

#[derive(Default)]
struct BrokerState {
    loss_handlers: Vec<LossHandler>,
    subscriptions: HashMap<u64, Delivery>,
}

struct Delivery {
    subject: String,
    queue_group: Option<String>,
    handler: MessageHandler,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` connect attempts with a transport error.
    pub fn fail_connects(&self, n: u32) {
        self.inner.connect_failures.store(n, Ordering::SeqCst);
    }

    /// Total connect attempts observed, successful or not.
    pub fn connect_attempts(&self) -> u32 {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    /// Reject the next broker-side unsubscribe.
    pub fn fail_next_unsubscribe(&self) {
        self.inner.fail_next_unsubscribe.store(true, Ordering::SeqCst);
    }

    /// Subscriptions currently registered at the broker.
    pub fn subscription_count(&self) -> usize {
        self.inner.state.lock().subscriptions.len()
    }

    /// Deliver a payload: every plain subscription on the subject receives
    /// it, plus exactly one member per queue group.
    pub fn publish(&self, subject: &str, payload: &[u8]) {
        deliver(&self.inner, subject, payload);
    }

    /// Sever the current connection. Its subscriptions die with it and
    /// every installed loss handler fires on its own thread, mirroring a
    /// real broker's callback context.
    pub fn drop_connection(&self, reason: &str) {
        let handlers = {
            let mut state = self.inner.state.lock();
            state.subscriptions.clear();
            std::mem::take(&mut state.loss_handlers)
        };
        for handler in handlers {
            let reason = BrokerError::new(reason);
            thread::spawn(move || handler(reason));
        }
    }
}

fn deliver(inner: &BrokerInner, subject: &str, payload: &[u8]) {
    // Collect handlers under the lock, invoke them outside it.
    let handlers: Vec<MessageHandler> = {
        let state = inner.state.lock();
        let mut plain = Vec::new();
        let mut groups: HashMap<&str, (u64, &MessageHandler)> = HashMap::new();
        for (id, delivery) in &state.subscriptions {
            if delivery.subject != subject {
                continue;
            }
            match &delivery.queue_group {
                None => plain.push(Arc::clone(&delivery.handler)),
                Some(group) => {
                    let member = groups
                        .entry(group.as_str())
                        .or_insert((*id, &delivery.handler));
                    if *id < member.0 {
                        *member = (*id, &delivery.handler);
                    }
                }
            }
        }
        plain.extend(groups.into_values().map(|(_, handler)| Arc::clone(handler)));
        plain
    };

    for handler in handlers {
        handler(payload);
    }
}

impl BrokerConnector for MemoryBroker {
    fn connect(
        &self,
        _cluster_id: &str,
        _client_id: &str,
        _url: &str,
        on_connection_lost: LossHandler,
    ) -> Result<Box<dyn BrokerConnection>, BrokerError> {
        self.inner.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if self.inner.connect_failures.load(Ordering::SeqCst) > 0 {
            self.inner.connect_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(BrokerError::new("broker unavailable"));
        }
        self.inner.state.lock().loss_handlers.push(on_connection_lost);
        Ok(Box::new(MemoryConnection {
            broker: Arc::clone(&self.inner),
        }))
    }
}

struct MemoryConnection {
    broker: Arc<BrokerInner>,
}

impl MemoryConnection {
    fn add_subscription(
        &self,
        subject: &str,
        queue_group: Option<&str>,
        handler: MessageHandler,
    ) -> Box<dyn BrokerSubscription> {
        let id = self.broker.next_id.fetch_add(1, Ordering::SeqCst);
        self.broker.state.lock().subscriptions.insert(
            id,
            Delivery {
                subject: subject.to_string(),
                queue_group: queue_group.map(str::to_string),
                handler,
            },
        );
        Box::new(MemorySubscription {
            broker: Arc::clone(&self.broker),
            id,
        })
    }
}

impl BrokerConnection for MemoryConnection {
    fn subscribe(
        &self,
        subject: &str,
        _durable_name: &str,
        handler: MessageHandler,
    ) -> Result<Box<dyn BrokerSubscription>, BrokerError> {
        Ok(self.add_subscription(subject, None, handler))
    }

    fn queue_subscribe(
        &self,
        subject: &str,
        queue_group: &str,
        _durable_name: &str,
        handler: MessageHandler,
    ) -> Result<Box<dyn BrokerSubscription>, BrokerError> {
        Ok(self.add_subscription(subject, Some(queue_group), handler))
    }

    fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), BrokerError> {
        deliver(&self.broker, subject, payload);
        Ok(())
    }

    fn close(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}

struct MemorySubscription {
    broker: Arc<BrokerInner>,
    id: u64,
}

impl BrokerSubscription for MemorySubscription {
    fn unsubscribe(&self) -> Result<(), BrokerError> {
        if self
            .broker
            .fail_next_unsubscribe
            .swap(false, Ordering::SeqCst)
        {
            return Err(BrokerError::new("unsubscribe rejected"));
        }
        self.broker.state.lock().subscriptions.remove(&self.id);
        Ok(())
    }
}

/// Logger that records info lines and reports fatal calls through a
/// channel before panicking the calling thread. The panic stands in for
/// process termination without killing the test process.
pub struct RecordingLogger {
    infos: Mutex<Vec<String>>,
    fatal_tx: Sender<String>,
}

impl RecordingLogger {
    pub fn new() -> (Arc<Self>, Receiver<String>) {
        let (fatal_tx, fatal_rx) = unbounded();
        (
            Arc::new(Self {
                infos: Mutex::new(Vec::new()),
                fatal_tx,
            }),
            fatal_rx,
        )
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().clone()
    }
}

impl ClientLogger for RecordingLogger {
    fn info(&self, message: &str) {
        self.infos.lock().push(message.to_string());
    }

    fn fatal(&self, message: &str) -> ! {
        let _ = self.fatal_tx.send(message.to_string());
        panic!("fatal: {message}");
    }
}

/// Subscriber whose handler forwards payloads into a channel.
pub struct ChannelSubscriber {
    subject: String,
    name: String,
    tx: Sender<Vec<u8>>,
}

impl ChannelSubscriber {
    pub fn new(subject: &str, name: &str) -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = unbounded();
        (
            Self {
                subject: subject.to_string(),
                name: name.to_string(),
                tx,
            },
            rx,
        )
    }
}

impl Subscriber for ChannelSubscriber {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn durable_name(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn message_handler(&self) -> MessageHandler {
        let tx = self.tx.clone();
        Arc::new(move |payload| {
            let _ = tx.send(payload.to_vec());
        })
    }
}
