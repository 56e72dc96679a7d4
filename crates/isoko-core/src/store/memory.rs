//! In-memory document store
//!
//! Deterministic implementation of [`DocumentStore`] for tests and
//! offline development. Every mutation bumps the collection version and
//! re-broadcasts a full filtered snapshot to each live watcher, the
//! same push semantics the remote store provides.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{DocumentStore, FieldFilter, RawDocument, Snapshot, SnapshotStream};
use crate::error::{MarketError, MarketResult};

#[derive(Default)]
struct CollectionState {
    /// Documents in insertion order
    docs: Vec<RawDocument>,
    /// Bumped on every mutation
    version: u64,
    /// Next server-assigned id
    next_id: u64,
    /// Live subscriptions on this collection
    watchers: Vec<Watcher>,
}

struct Watcher {
    filter: Option<FieldFilter>,
    tx: mpsc::UnboundedSender<Snapshot>,
}

impl CollectionState {
    fn snapshot_for(&self, filter: &Option<FieldFilter>) -> Snapshot {
        let docs = self
            .docs
            .iter()
            .filter(|doc| match filter {
                Some(f) => f.matches(&doc.data),
                None => true,
            })
            .cloned()
            .collect();
        Snapshot {
            version: self.version,
            docs,
        }
    }

    /// Push the current state to every watcher, dropping closed ones
    fn broadcast(&mut self) {
        let version = self.version;
        let docs = std::mem::take(&mut self.docs);
        self.watchers.retain(|watcher| {
            let snapshot = Snapshot {
                version,
                docs: docs
                    .iter()
                    .filter(|doc| match &watcher.filter {
                        Some(f) => f.matches(&doc.data),
                        None => true,
                    })
                    .cloned()
                    .collect(),
            };
            watcher.tx.send(snapshot).is_ok()
        });
        self.docs = docs;
    }
}

/// In-memory [`DocumentStore`]
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, CollectionState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collection<T>(&self, collection: &str, f: impl FnOnce(&mut CollectionState) -> T) -> T {
        let mut collections = self.collections.lock().expect("store lock poisoned");
        f(collections.entry(collection.to_string()).or_default())
    }

    /// Current version of a collection (0 if it has never been written)
    pub fn version(&self, collection: &str) -> u64 {
        self.with_collection(collection, |state| state.version)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> MarketResult<SnapshotStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.with_collection(collection, |state| {
            // Initial snapshot is delivered immediately on subscribe
            let _ = tx.send(state.snapshot_for(&filter));
            state.watchers.push(Watcher { filter, tx });
        });
        Ok(rx)
    }

    async fn create(&self, collection: &str, doc: Value) -> MarketResult<String> {
        Ok(self.with_collection(collection, |state| {
            state.next_id += 1;
            let id = format!("doc-{}", state.next_id);
            state.docs.push(RawDocument {
                id: id.clone(),
                data: doc,
            });
            state.version += 1;
            state.broadcast();
            id
        }))
    }

    async fn put(&self, collection: &str, id: &str, doc: Value) -> MarketResult<()> {
        self.with_collection(collection, |state| {
            match state.docs.iter_mut().find(|d| d.id == id) {
                Some(existing) => existing.data = doc,
                None => state.docs.push(RawDocument {
                    id: id.to_string(),
                    data: doc,
                }),
            }
            state.version += 1;
            state.broadcast();
        });
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> MarketResult<()> {
        self.with_collection(collection, |state| {
            let Some(doc) = state.docs.iter_mut().find(|d| d.id == id) else {
                return Err(MarketError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            };

            // Shallow field merge, matching the remote store's update
            if let (Some(target), Some(fields)) = (doc.data.as_object_mut(), patch.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
            }
            state.version += 1;
            state.broadcast();
            Ok(())
        })
    }

    async fn read(&self, collection: &str, id: &str) -> MarketResult<Option<Value>> {
        Ok(self.with_collection(collection, |state| {
            state
                .docs
                .iter()
                .find(|d| d.id == id)
                .map(|d| d.data.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_read() {
        let store = MemoryStore::new();
        let id = store
            .create("products", json!({"name": "Maize", "price": 300.0}))
            .await
            .unwrap();

        let doc = store.read("products", &id).await.unwrap().unwrap();
        assert_eq!(doc["name"], "Maize");

        assert!(store.read("products", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_and_updates() {
        let store = MemoryStore::new();
        store.create("chat", json!({"text": "first"})).await.unwrap();

        let mut stream = store.subscribe("chat", None).await.unwrap();
        let initial = stream.recv().await.unwrap();
        assert_eq!(initial.docs.len(), 1);

        store.create("chat", json!({"text": "second"})).await.unwrap();
        let next = stream.recv().await.unwrap();
        assert_eq!(next.docs.len(), 2);
        assert!(next.version > initial.version);
    }

    #[tokio::test]
    async fn test_snapshot_is_full_replacement() {
        let store = MemoryStore::new();
        let mut stream = store.subscribe("products", None).await.unwrap();
        stream.recv().await.unwrap(); // empty initial

        store.create("products", json!({"name": "A"})).await.unwrap();
        store.create("products", json!({"name": "B"})).await.unwrap();

        // Each snapshot carries the complete set, not a diff
        let snap1 = stream.recv().await.unwrap();
        assert_eq!(snap1.docs.len(), 1);
        let snap2 = stream.recv().await.unwrap();
        assert_eq!(snap2.docs.len(), 2);
    }

    #[tokio::test]
    async fn test_filtered_subscription() {
        let store = MemoryStore::new();
        let filter = FieldFilter::equals("buyerId", "b1");
        let mut stream = store.subscribe("orders", Some(filter)).await.unwrap();
        stream.recv().await.unwrap();

        store
            .create("orders", json!({"buyerId": "b1", "status": "Pending"}))
            .await
            .unwrap();
        store
            .create("orders", json!({"buyerId": "b2", "status": "Pending"}))
            .await
            .unwrap();

        let snap = stream.recv().await.unwrap();
        assert_eq!(snap.docs.len(), 1);
        // The second create still produces a snapshot; the foreign
        // document just isn't in it
        let snap = stream.recv().await.unwrap();
        assert_eq!(snap.docs.len(), 1);
        assert_eq!(snap.docs[0].data["buyerId"], "b1");
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let id = store
            .create("orders", json!({"status": "Pending", "buyerId": "b1"}))
            .await
            .unwrap();

        store
            .update("orders", &id, json!({"status": "Shipped", "shippedAt": "2026-01-01T00:00:00Z"}))
            .await
            .unwrap();

        let doc = store.read("orders", &id).await.unwrap().unwrap();
        assert_eq!(doc["status"], "Shipped");
        assert_eq!(doc["buyerId"], "b1");
        assert_eq!(doc["shippedAt"], "2026-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryStore::new();
        let result = store.update("orders", "nope", json!({"status": "Shipped"})).await;
        assert!(matches!(result, Err(MarketError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_put_is_fixed_id_upsert() {
        let store = MemoryStore::new();
        store
            .put("profiles", "user-1", json!({"role": "farmer"}))
            .await
            .unwrap();
        store
            .put("profiles", "user-1", json!({"role": "buyer"}))
            .await
            .unwrap();

        let doc = store.read("profiles", "user-1").await.unwrap().unwrap();
        assert_eq!(doc["role"], "buyer");
    }

    #[tokio::test]
    async fn test_dropped_watcher_is_pruned() {
        let store = MemoryStore::new();
        let stream = store.subscribe("chat", None).await.unwrap();
        drop(stream);

        // Broadcast to the closed watcher must not fail the write
        store.create("chat", json!({"text": "hi"})).await.unwrap();
        assert_eq!(store.version("chat"), 1);
    }
}
