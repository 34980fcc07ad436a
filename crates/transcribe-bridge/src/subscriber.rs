//! Single-slot store for the current subscriber.

use std::sync::RwLock;

use crate::bridge::protocol::SubscriberId;

/// Holds at most one subscriber. Registration replaces; nothing ever clears it.
///
/// Readers take a clone, so a request sees exactly one value for its whole
/// delivery step even if a registration lands concurrently.
#[derive(Debug, Default)]
pub struct SubscriberSlot {
    current: RwLock<Option<SubscriberId>>,
}

impl SubscriberSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the subscriber, returning the previous one.
    pub fn register(&self, id: SubscriberId) -> Option<SubscriberId> {
        // A poisoned lock still holds a valid Option; recover it.
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Subscriber slot lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.replace(id)
    }

    pub fn current(&self) -> Option<SubscriberId> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.current().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let slot = SubscriberSlot::new();
        assert!(!slot.is_registered());
        assert_eq!(slot.current(), None);
    }

    #[test]
    fn register_replaces_previous() {
        let slot = SubscriberSlot::new();
        assert_eq!(slot.register(SubscriberId::new("a")), None);
        assert_eq!(
            slot.register(SubscriberId::new("b")),
            Some(SubscriberId::new("a"))
        );
        assert_eq!(slot.current(), Some(SubscriberId::new("b")));
    }

    #[test]
    fn register_same_id_twice_is_idempotent() {
        let once = SubscriberSlot::new();
        once.register(SubscriberId::new("a"));

        let twice = SubscriberSlot::new();
        twice.register(SubscriberId::new("a"));
        twice.register(SubscriberId::new("a"));

        assert_eq!(once.current(), twice.current());
    }

    #[test]
    fn survives_poisoned_lock() {
        use std::sync::Arc;

        let slot = Arc::new(SubscriberSlot::new());
        slot.register(SubscriberId::new("a"));

        let poisoner = Arc::clone(&slot);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.current.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(slot.current(), Some(SubscriberId::new("a")));
        slot.register(SubscriberId::new("b"));
        assert_eq!(slot.current(), Some(SubscriberId::new("b")));
    }
}
