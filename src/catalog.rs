//! # Resource catalog: immutable facts about reservable items.
//!
//! A [`Resource`] holds the catalog facts (id, display name, unit price,
//! initial quantity). The *current* quantity is deliberately absent: it is
//! mutable state and lives only in the counter store, keyed by
//! [`Resource::counter_key`].
//!
//! [`Catalog::seed`] performs the one initialization write per resource that
//! the pipeline allows, and must run before any worker starts.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::CounterStore;

/// Immutable catalog entry for a reservable resource.
///
/// Invariant: after [`Catalog::seed`], the counter under
/// [`counter_key`](Resource::counter_key) stays within
/// `0..=initial_quantity` and is mutated only through
/// [`CounterStore::try_decrement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Catalog identifier.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Unit price in whole currency units.
    pub price: u32,
    /// Quantity available when the system starts.
    pub initial_quantity: u32,
}

impl Resource {
    /// Key under which this resource's current quantity lives in the
    /// counter store.
    pub fn counter_key(&self) -> String {
        format!("item.{}", self.id)
    }
}

/// Lookup table of reservable resources.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Resource>,
}

impl Catalog {
    /// Creates a catalog from the given resources.
    pub fn new(items: Vec<Resource>) -> Self {
        Self { items }
    }

    /// Looks up a resource by catalog id.
    pub fn get(&self, id: u32) -> Option<&Resource> {
        self.items.iter().find(|r| r.id == id)
    }

    /// All catalog entries, in insertion order.
    pub fn items(&self) -> &[Resource] {
        &self.items
    }

    /// Writes each resource's initial quantity into the counter store.
    ///
    /// This is the single initialization write the pipeline allows per
    /// resource; call it exactly once, before serving traffic.
    pub async fn seed(&self, store: &dyn CounterStore) -> Result<(), StoreError> {
        for item in &self.items {
            store
                .initialize(&item.counter_key(), item.initial_quantity)
                .await?;
        }
        Ok(())
    }
}

/// Demo catalog used by examples and tests.
pub fn demo_catalog() -> Catalog {
    Catalog::new(vec![
        Resource {
            id: 1,
            name: "Suitcase 250".into(),
            price: 50,
            initial_quantity: 4,
        },
        Resource {
            id: 2,
            name: "Suitcase 450".into(),
            price: 100,
            initial_quantity: 10,
        },
        Resource {
            id: 3,
            name: "Suitcase 650".into(),
            price: 350,
            initial_quantity: 2,
        },
        Resource {
            id: 4,
            name: "Suitcase 1050".into(),
            price: 550,
            initial_quantity: 5,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn lookup_by_id() {
        let catalog = demo_catalog();
        assert_eq!(catalog.get(3).map(|r| r.price), Some(350));
        assert!(catalog.get(99).is_none());
    }

    #[test]
    fn items_preserve_insertion_order() {
        let catalog = demo_catalog();
        let ids: Vec<u32> = catalog.items().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn counter_key_matches_store_layout() {
        let catalog = demo_catalog();
        assert_eq!(catalog.get(3).map(|r| r.counter_key()).as_deref(), Some("item.3"));
    }

    #[tokio::test]
    async fn seed_writes_initial_quantities() {
        let store = MemoryStore::new();
        let catalog = demo_catalog();
        catalog.seed(&store).await.unwrap();

        assert_eq!(store.read("item.1").await.unwrap(), Some(4));
        assert_eq!(store.read("item.3").await.unwrap(), Some(2));
        assert_eq!(store.read("item.9").await.unwrap(), None);
    }
}
