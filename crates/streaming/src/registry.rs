use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::protocol::{ChannelMessage, Topic};

pub type Handler = Arc<dyn Fn(&ChannelMessage) + Send + Sync>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Entry {
    id: HandlerId,
    handler: Handler,
}

/// Per-topic handler sets.
///
/// Registering the same `Arc` twice under one topic yields a single
/// registration, delivered once per message. Every handle to it refers to
/// that one registration, so the first release removes it and later ones
/// are no-ops.
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: u64,
    topics: HashMap<Topic, Vec<Entry>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, topic: Topic, handler: Handler) -> HandlerId {
        let entries = self.topics.entry(topic).or_default();
        if let Some(existing) = entries
            .iter()
            .find(|e| std::ptr::addr_eq(Arc::as_ptr(&e.handler), Arc::as_ptr(&handler)))
        {
            return existing.id;
        }
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        entries.push(Entry { id, handler });
        id
    }

    /// Removes registration `id`; returns false when it was already gone.
    pub fn release(&mut self, topic: Topic, id: HandlerId) -> bool {
        let Some(entries) = self.topics.get_mut(&topic) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        entries.remove(pos);
        if entries.is_empty() {
            self.topics.remove(&topic);
        }
        true
    }

    /// Handlers for `topic` followed by the wildcard handlers, cloned so the
    /// caller can invoke them without holding the registry.
    pub fn snapshot(&self, topic: Topic) -> Vec<Handler> {
        let specific = self.topics.get(&topic).into_iter().flatten();
        let wildcard = match topic {
            Topic::All => None,
            _ => self.topics.get(&Topic::All),
        };
        specific
            .chain(wildcard.into_iter().flatten())
            .map(|e| e.handler.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.topics.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn clear(&mut self) {
        self.topics.clear();
    }
}

/// Handle to one handler registration.
///
/// Dropping the handle unsubscribes; call [`Subscription::detach`] to keep the
/// handler registered for as long as the channel lives.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    registry: Weak<Mutex<HandlerRegistry>>,
    topic: Topic,
    id: HandlerId,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(registry: &Arc<Mutex<HandlerRegistry>>, topic: Topic, id: HandlerId) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            topic,
            id,
            active: true,
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().release(self.topic, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Handler, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let handler: Handler = Arc::new(move |_: &ChannelMessage| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (handler, hits)
    }

    fn deliver(reg: &HandlerRegistry, msg: &ChannelMessage) {
        for h in reg.snapshot(msg.topic()) {
            h(msg);
        }
    }

    #[test]
    fn same_handler_twice_is_delivered_once() {
        let mut reg = HandlerRegistry::new();
        let (h, hits) = counting();
        let a = reg.add(Topic::WeatherUpdate, h.clone());
        let b = reg.add(Topic::WeatherUpdate, h);
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);

        deliver(&reg, &ChannelMessage::WeatherUpdate(json!({})));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wildcard_sees_every_topic() {
        let mut reg = HandlerRegistry::new();
        let (all, all_hits) = counting();
        let (air, air_hits) = counting();
        reg.add(Topic::All, all);
        reg.add(Topic::AirQualityUpdate, air);

        deliver(&reg, &ChannelMessage::AirQualityUpdate(json!({})));
        deliver(&reg, &ChannelMessage::WeatherUpdate(json!({})));
        assert_eq!(air_hits.load(Ordering::SeqCst), 1);
        assert_eq!(all_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn first_release_removes_shared_registration() {
        let mut reg = HandlerRegistry::new();
        let (h, hits) = counting();
        let id = reg.add(Topic::Alert, h.clone());
        assert_eq!(reg.add(Topic::Alert, h.clone()), id);

        assert!(reg.release(Topic::Alert, id));
        assert!(reg.is_empty());
        assert!(!reg.release(Topic::Alert, id));

        deliver(&reg, &ChannelMessage::Alert(serde_json::from_value(json!({
            "severity": "low",
            "message": "gone"
        })).unwrap()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let again = reg.add(Topic::Alert, h);
        assert_ne!(again, id);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn stale_handle_does_not_remove_a_newer_registration() {
        let reg = Arc::new(Mutex::new(HandlerRegistry::new()));
        let (h, _) = counting();
        let id = reg.lock().add(Topic::Alert, h.clone());
        let first = Subscription::new(&reg, Topic::Alert, id);
        let second = Subscription::new(&reg, Topic::Alert, reg.lock().add(Topic::Alert, h.clone()));

        first.unsubscribe();
        assert!(reg.lock().is_empty());

        let id = reg.lock().add(Topic::Alert, h);
        let _third = Subscription::new(&reg, Topic::Alert, id);
        drop(second);
        assert_eq!(reg.lock().len(), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let reg = Arc::new(Mutex::new(HandlerRegistry::new()));
        let (h, _) = counting();
        let (other, _) = counting();
        let id = reg.lock().add(Topic::Alert, h);
        let sub = Subscription::new(&reg, Topic::Alert, id);
        let keep = reg.lock().add(Topic::Alert, other);
        Subscription::new(&reg, Topic::Alert, keep).detach();

        drop(sub);
        assert_eq!(reg.lock().len(), 1);
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let reg = Arc::new(Mutex::new(HandlerRegistry::new()));
        let (h, _) = counting();
        let id = reg.lock().add(Topic::Alert, h);
        let sub = Subscription::new(&reg, Topic::Alert, id);
        drop(reg);
        sub.unsubscribe();
    }
}
