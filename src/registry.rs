//! In-memory subscriber registry: chat user id -> WaniKani API token.

use std::collections::HashMap;
use std::sync::RwLock;

/// Subscriber store shared between the webhook handlers and the scheduler.
/// Volatile: contents are lost on restart. This is the only shared mutable
/// state in the bot, so its lock is the only synchronization anywhere.
#[derive(Default)]
pub struct SubscriberRegistry {
    inner: RwLock<HashMap<String, String>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the credential stored for a subscriber.
    pub fn put(&self, subscriber_id: &str, credential: &str) {
        self.inner
            .write()
            .expect("subscriber registry lock poisoned")
            .insert(subscriber_id.to_string(), credential.to_string());
    }

    pub fn get(&self, subscriber_id: &str) -> Option<String> {
        self.inner
            .read()
            .expect("subscriber registry lock poisoned")
            .get(subscriber_id)
            .cloned()
    }

    /// Remove a subscriber. Returns whether an entry existed.
    pub fn remove(&self, subscriber_id: &str) -> bool {
        self.inner
            .write()
            .expect("subscriber registry lock poisoned")
            .remove(subscriber_id)
            .is_some()
    }

    /// Snapshot of all (subscriber, credential) pairs, in no particular order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.inner
            .read()
            .expect("subscriber registry lock poisoned")
            .iter()
            .map(|(id, credential)| (id.clone(), credential.clone()))
            .collect()
    }
}
