//! Subscription registry with tombstone bookkeeping.
//!
//! Every subscription the client ever made stays in the registry as a key.
//! Unsubscribing only clears the entry's handle, so the registry can
//! distinguish "known but inactive" from "never registered". Entries are
//! destroyed only when the whole client is dropped.

use crate::broker::BrokerSubscription;
use std::collections::HashMap;

/// Build the composite key a subscription is registered under.
///
/// `{subject}-{name}` for plain subscriptions,
/// `{subject}-{queue_group}-{name}` for queue subscriptions. Key uniqueness
/// is the caller's contract: re-subscribing under an existing key silently
/// overwrites the entry and may orphan the prior live handle.
pub fn subscription_key(subject: &str, queue_group: Option<&str>, name: &str) -> String {
    match queue_group {
        Some(group) => format!("{subject}-{group}-{name}"),
        None => format!("{subject}-{name}"),
    }
}

/// Maps composite subscription keys to live broker handles.
///
/// Not synchronized: the owning client guards the registry with the same
/// lock that guards the connection handle.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<String, Option<Box<dyn BrokerSubscription>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a live subscription, overwriting any prior entry under the
    /// same key (last-write-wins).
    pub fn insert(&mut self, key: String, handle: Box<dyn BrokerSubscription>) {
        self.entries.insert(key, Some(handle));
    }

    /// Whether the key was ever registered, live or tombstoned.
    pub fn is_known(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Take the live handle for `key`, leaving a tombstone behind.
    ///
    /// Returns `None` for unknown keys and for keys that are already
    /// tombstoned.
    pub fn take_live(&mut self, key: &str) -> Option<Box<dyn BrokerSubscription>> {
        self.entries.get_mut(key).and_then(Option::take)
    }

    /// Put a handle back under a key whose broker-side unsubscribe failed.
    pub fn restore(&mut self, key: String, handle: Box<dyn BrokerSubscription>) {
        self.entries.insert(key, Some(handle));
    }

    /// Keys with a live handle, in unspecified order.
    pub fn live_keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, handle)| handle.is_some())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of live (non-tombstoned) entries.
    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|handle| handle.is_some()).count()
    }
}
