//! Real-time collection mirroring
//!
//! The [`SyncEngine`] keeps one live mirror per subscribed collection.
//! Each incoming snapshot is decoded into a fresh [`Mirror`] that
//! replaces the previous one atomically (a `watch` channel holds the
//! latest `Arc`, so consumers can never observe a half-updated mirror).
//!
//! Handles are fully independent: one tokio task per subscription, no
//! shared lock, no ordering guarantee across collections.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::{DocumentStore, FieldFilter, Snapshot};

/// A decoded document: server-assigned id plus typed payload
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    pub id: String,
    pub data: T,
}

/// Local cache of one remote collection
///
/// Replaced wholesale on every snapshot; iteration follows snapshot
/// order. The version counter exists for staleness detection in tests,
/// not for conflict resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Mirror<T> {
    entries: Vec<Document<T>>,
    version: u64,
}

impl<T> Default for Mirror<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            version: 0,
        }
    }
}

impl<T> Mirror<T> {
    /// Look up a document by id
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.iter().find(|d| d.id == id).map(|d| &d.data)
    }

    /// Iterate documents in snapshot order
    pub fn iter(&self) -> impl Iterator<Item = &Document<T>> {
        self.entries.iter()
    }

    /// Number of documents in the mirror
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mirror holds no documents
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot version this mirror was built from
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl<T: DeserializeOwned> Mirror<T> {
    /// Build a mirror from a raw snapshot
    ///
    /// A document that fails to decode is skipped with a warning; one
    /// malformed document must not blind the client to the rest of the
    /// collection.
    fn from_snapshot(collection: &str, snapshot: Snapshot) -> Self {
        let mut entries = Vec::with_capacity(snapshot.docs.len());
        for doc in snapshot.docs {
            match serde_json::from_value::<T>(doc.data) {
                Ok(data) => entries.push(Document { id: doc.id, data }),
                Err(e) => {
                    warn!(collection, id = %doc.id, "Skipping undecodable document: {}", e);
                }
            }
        }
        Self {
            entries,
            version: snapshot.version,
        }
    }
}

/// Events emitted by the sync engine, for the presentation layer
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A mirror was replaced with a new snapshot
    MirrorUpdated { collection: String, version: u64 },
    /// Subscription establishment failed and will be retried
    SubscribeRetry { collection: String, error: String },
    /// The store closed a subscription stream
    SubscriptionEnded { collection: String },
}

/// Handle to one live mirror
///
/// Dropping the handle tears the subscription down: the task is
/// aborted, so no further mirror mutation or notification happens.
pub struct MirrorHandle<T> {
    rx: watch::Receiver<Arc<Mirror<T>>>,
    task: JoinHandle<()>,
}

impl<T> MirrorHandle<T> {
    /// The latest mirror
    pub fn current(&self) -> Arc<Mirror<T>> {
        self.rx.borrow().clone()
    }

    /// A receiver for observing mirror replacements
    pub fn subscribe(&self) -> watch::Receiver<Arc<Mirror<T>>> {
        self.rx.clone()
    }

    /// Wait for the next mirror replacement
    ///
    /// Returns `false` once the subscription has ended.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl<T> Drop for MirrorHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Owns live mirrors of remote collections
pub struct SyncEngine {
    store: Arc<dyn DocumentStore>,
    /// First delay between establishment attempts; doubles up to the cap
    initial_retry_delay: Duration,
    max_retry_delay: Duration,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<SyncEvent>>,
}

impl SyncEngine {
    /// Create an engine over a document store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            store,
            initial_retry_delay: Duration::from_millis(1000),
            max_retry_delay: Duration::from_secs(30),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Override establishment retry delays
    pub fn with_retry_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_retry_delay = initial;
        self.max_retry_delay = max;
        self
    }

    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SyncEvent>> {
        self.event_rx.take()
    }

    /// Open a live mirror on a collection
    ///
    /// Subscription establishment is retried indefinitely with capped
    /// exponential backoff; once the stream is live it is trusted until
    /// the handle is dropped. The handle starts with an empty mirror
    /// and fills on the first snapshot.
    pub async fn open_mirror<T>(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> MirrorHandle<T>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let mut delay = self.initial_retry_delay;
        let mut stream = loop {
            match self.store.subscribe(collection, filter.clone()).await {
                Ok(stream) => break stream,
                Err(e) => {
                    warn!(collection, "Subscription failed, retrying in {:?}: {}", delay, e);
                    self.emit(SyncEvent::SubscribeRetry {
                        collection: collection.to_string(),
                        error: e.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max_retry_delay);
                }
            }
        };
        info!(collection, "Subscription established");

        let (watch_tx, watch_rx) = watch::channel(Arc::new(Mirror::<T>::default()));
        let event_tx = self.event_tx.clone();
        let name = collection.to_string();

        let task = tokio::spawn(async move {
            while let Some(snapshot) = stream.recv().await {
                let mirror = Mirror::from_snapshot(&name, snapshot);
                let version = mirror.version();
                debug!(collection = %name, version, count = mirror.len(), "Mirror replaced");
                if watch_tx.send(Arc::new(mirror)).is_err() {
                    break;
                }
                let _ = event_tx.send(SyncEvent::MirrorUpdated {
                    collection: name.clone(),
                    version,
                });
            }
            let _ = event_tx.send(SyncEvent::SubscriptionEnded { collection: name });
        });

        MirrorHandle { rx: watch_rx, task }
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MarketError, MarketResult};
    use crate::models::{Order, OrderStatus, Product};
    use crate::store::{MemoryStore, SnapshotStream};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn product_doc(owner: &str, name: &str, price: f64) -> Value {
        serde_json::to_value(Product::new(
            owner,
            name,
            "vegetable",
            "Kigali",
            "+250700000001",
            "desc",
            price,
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_mirror_fills_from_initial_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.create("products", product_doc("f1", "Beans", 200.0)).await.unwrap();

        let engine = SyncEngine::new(store);
        let mut handle = engine.open_mirror::<Product>("products", None).await;

        assert!(handle.current().is_empty());
        assert!(handle.changed().await);

        let mirror = handle.current();
        assert_eq!(mirror.len(), 1);
        assert_eq!(mirror.iter().next().unwrap().data.name, "Beans");
    }

    #[tokio::test]
    async fn test_mirror_is_replaced_wholesale() {
        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(store.clone());
        let mut handle = engine.open_mirror::<Product>("products", None).await;
        handle.changed().await; // empty initial snapshot

        store.create("products", product_doc("f1", "Beans", 200.0)).await.unwrap();
        handle.changed().await;
        let first = handle.current();

        store.create("products", product_doc("f2", "Maize", 300.0)).await.unwrap();
        handle.changed().await;
        let second = handle.current();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert!(second.version() > first.version());
        // The old Arc is untouched by the replacement
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn test_mirror_get_by_id() {
        let store = Arc::new(MemoryStore::new());
        let id = store.create("products", product_doc("f1", "Beans", 200.0)).await.unwrap();

        let engine = SyncEngine::new(store);
        let mut handle = engine.open_mirror::<Product>("products", None).await;
        handle.changed().await;

        let mirror = handle.current();
        assert_eq!(mirror.get(&id).unwrap().name, "Beans");
        assert!(mirror.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_undecodable_document_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.create("products", product_doc("f1", "Beans", 200.0)).await.unwrap();
        store.create("products", json!({"garbage": true})).await.unwrap();

        let engine = SyncEngine::new(store);
        let mut handle = engine.open_mirror::<Product>("products", None).await;
        handle.changed().await;

        let mirror = handle.current();
        assert_eq!(mirror.len(), 1);
        assert_eq!(mirror.iter().next().unwrap().data.name, "Beans");
    }

    #[tokio::test]
    async fn test_independent_filtered_mirrors_share_a_document() {
        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(store.clone());

        let mut as_buyer = engine
            .open_mirror::<Order>("orders", Some(FieldFilter::equals("buyerId", "B1")))
            .await;
        let mut as_farmer = engine
            .open_mirror::<Order>("orders", Some(FieldFilter::equals("farmerId", "F1")))
            .await;
        as_buyer.changed().await;
        as_farmer.changed().await;

        let product = Product::new("F1", "Beans", "vegetable", "Huye", "+250", "d", 500.0);
        let order = Order::place("prod-1", &product, "B1");
        store
            .create("orders", serde_json::to_value(&order).unwrap())
            .await
            .unwrap();

        as_buyer.changed().await;
        as_farmer.changed().await;

        // Both mirrors hold the document independently
        let buyer_mirror = as_buyer.current();
        let farmer_mirror = as_farmer.current();
        assert_eq!(buyer_mirror.len(), 1);
        assert_eq!(farmer_mirror.len(), 1);
        assert_eq!(buyer_mirror.iter().next().unwrap().data.status, OrderStatus::Pending);
        assert_eq!(
            buyer_mirror.iter().next().unwrap().id,
            farmer_mirror.iter().next().unwrap().id
        );
    }

    #[tokio::test]
    async fn test_drop_handle_stops_notifications() {
        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(store.clone());
        let handle = engine.open_mirror::<Product>("products", None).await;

        let rx = handle.subscribe();
        drop(handle);

        // Writes after teardown still succeed; the watcher is simply gone
        store.create("products", product_doc("f1", "Beans", 200.0)).await.unwrap();
        let mirror = rx.borrow().clone();
        assert!(mirror.is_empty());
    }

    #[tokio::test]
    async fn test_events_emitted_on_update() {
        let store = Arc::new(MemoryStore::new());
        let mut engine = SyncEngine::new(store.clone());
        let mut events = engine.take_events().unwrap();
        assert!(engine.take_events().is_none());

        let mut handle = engine.open_mirror::<Product>("products", None).await;
        handle.changed().await;

        match events.recv().await.unwrap() {
            SyncEvent::MirrorUpdated { collection, .. } => assert_eq!(collection, "products"),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    /// Store whose subscribe fails a fixed number of times first
    struct FlakyStore {
        inner: MemoryStore,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn subscribe(
            &self,
            collection: &str,
            filter: Option<FieldFilter>,
        ) -> MarketResult<SnapshotStream> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(MarketError::transient("connection refused"));
            }
            self.inner.subscribe(collection, filter).await
        }

        async fn create(&self, collection: &str, doc: Value) -> MarketResult<String> {
            self.inner.create(collection, doc).await
        }

        async fn put(&self, collection: &str, id: &str, doc: Value) -> MarketResult<()> {
            self.inner.put(collection, id, doc).await
        }

        async fn update(&self, collection: &str, id: &str, patch: Value) -> MarketResult<()> {
            self.inner.update(collection, id, patch).await
        }

        async fn read(&self, collection: &str, id: &str) -> MarketResult<Option<Value>> {
            self.inner.read(collection, id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_establishment_retries_until_success() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failures_left: AtomicU32::new(3),
        });
        store.inner.create("products", product_doc("f1", "Beans", 200.0)).await.unwrap();

        let mut engine = SyncEngine::new(store);
        let mut events = engine.take_events().unwrap();
        let mut handle = engine.open_mirror::<Product>("products", None).await;
        handle.changed().await;
        assert_eq!(handle.current().len(), 1);

        // Three retry events were emitted before establishment
        let mut retries = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SyncEvent::SubscribeRetry { .. }) {
                retries += 1;
            }
        }
        assert_eq!(retries, 3);
    }
}
