use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::storage::Engine;

/// The default engine: a single hash map behind a mutex. Every operation is one critical
/// section, so operations on the same key are totally ordered and never observe a partial write.
///
/// The engine is cheap to clone using reference counting; clones share the same key space.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEngine {
    keys: Arc<Mutex<HashMap<Bytes, Bytes>>>,
}

impl InMemoryEngine {
    pub fn new() -> InMemoryEngine {
        InMemoryEngine::default()
    }

    pub fn with_capacity(capacity: usize) -> InMemoryEngine {
        InMemoryEngine {
            keys: Arc::new(Mutex::new(HashMap::with_capacity(capacity))),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic can never leave the map half-updated since each critical section is a single
    // map call, so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<Bytes, Bytes>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Engine for InMemoryEngine {
    fn set(&self, key: Bytes, value: Bytes) {
        self.lock().insert(key, value);
    }

    fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.lock().get(key).cloned()
    }

    fn del(&self, key: &[u8]) {
        self.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn set_and_get() {
        let engine = InMemoryEngine::new();

        engine.set(Bytes::from("foo"), Bytes::from("bar"));

        assert_eq!(engine.get(b"foo"), Some(Bytes::from("bar")));
        assert_eq!(engine.get(b"baz"), None);
    }

    #[test]
    fn empty_key_and_value() {
        let engine = InMemoryEngine::new();

        engine.set(Bytes::new(), Bytes::new());

        assert_eq!(engine.get(b""), Some(Bytes::new()));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn overwrite() {
        let engine = InMemoryEngine::new();

        engine.set(Bytes::from("foo"), Bytes::from("first"));
        engine.set(Bytes::from("foo"), Bytes::from("second"));

        assert_eq!(engine.get(b"foo"), Some(Bytes::from("second")));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn del() {
        let engine = InMemoryEngine::new();

        engine.del(b"missing");
        assert!(engine.is_empty());

        engine.set(Bytes::from("foo"), Bytes::from("bar"));
        engine.del(b"foo");

        assert_eq!(engine.get(b"foo"), None);
        assert!(engine.is_empty());
    }

    #[test]
    fn clones_share_key_space() {
        let engine = InMemoryEngine::with_capacity(16);
        let clone = engine.clone();

        clone.set(Bytes::from("foo"), Bytes::from("bar"));

        assert_eq!(engine.get(b"foo"), Some(Bytes::from("bar")));
    }

    #[test]
    fn same_key_writers_never_tear() {
        let engine = InMemoryEngine::new();
        let values: Vec<Bytes> = (0..32)
            .map(|i| Bytes::from(format!("{i}").repeat(64)))
            .collect();

        thread::scope(|s| {
            for value in &values {
                let (engine, values) = (&engine, &values);
                s.spawn(move || {
                    for _ in 0..100 {
                        engine.set(Bytes::from("shared"), value.clone());
                        let seen = engine.get(b"shared").unwrap();
                        assert!(values.contains(&seen));
                    }
                });
            }
        });

        assert!(values.contains(&engine.get(b"shared").unwrap()));
    }
}
