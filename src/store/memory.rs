//! In-process counter store.
//!
//! Check-and-decrement happens under a single write-lock acquisition with no
//! await inside, which makes it indivisible from every caller's point of view.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::counter::{CounterStore, Decrement};

/// In-memory [`CounterStore`] backend.
///
/// Suitable for tests and single-process deployments; durability is bounded
/// by the process lifetime.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, u32>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn initialize(&self, key: &str, quantity: u32) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), quantity);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<u32>, StoreError> {
        Ok(self.entries.read().await.get(key).copied())
    }

    async fn try_decrement(&self, key: &str) -> Result<Decrement, StoreError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(value) if *value > 0 => {
                *value -= 1;
                Ok(Decrement::Applied)
            }
            // Zero or absent: treated as exhausted, nothing mutated.
            _ => Ok(Decrement::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn initialize_then_read() {
        let store = MemoryStore::new();
        store.initialize("seat", 50).await.unwrap();
        assert_eq!(store.read("seat").await.unwrap(), Some(50));
        assert_eq!(store.read("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn decrement_stops_at_zero() {
        let store = MemoryStore::new();
        store.initialize("item.3", 2).await.unwrap();

        assert_eq!(store.try_decrement("item.3").await.unwrap(), Decrement::Applied);
        assert_eq!(store.try_decrement("item.3").await.unwrap(), Decrement::Applied);
        assert_eq!(store.try_decrement("item.3").await.unwrap(), Decrement::Exhausted);
        assert_eq!(store.read("item.3").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn absent_key_is_exhausted() {
        let store = MemoryStore::new();
        assert_eq!(store.try_decrement("nope").await.unwrap(), Decrement::Exhausted);
        assert_eq!(store.read("nope").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_decrements_never_overshoot() {
        let store = Arc::new(MemoryStore::new());
        store.initialize("seat", 7).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.try_decrement("seat").await.unwrap()
            }));
        }

        let mut applied = 0;
        let mut exhausted = 0;
        for h in handles {
            match h.await.unwrap() {
                Decrement::Applied => applied += 1,
                Decrement::Exhausted => exhausted += 1,
            }
        }

        assert_eq!(applied, 7);
        assert_eq!(exhausted, 25);
        assert_eq!(store.read("seat").await.unwrap(), Some(0));
    }
}
