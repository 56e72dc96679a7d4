//! Document store boundary
//!
//! The remote collection/document store is a swappable collaborator
//! behind the [`DocumentStore`] trait: subscribe for full-collection
//! snapshots, create/put/update documents, read one back. The real
//! backend lives outside this crate; [`memory::MemoryStore`] is the
//! deterministic in-memory implementation used by tests.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::MarketResult;

pub use memory::MemoryStore;

/// An equality filter on a single document field
///
/// The only query shape the store supports (e.g. `buyerId == <id>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    /// Create a filter matching documents where `field` equals `value`
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a raw document matches this filter
    pub fn matches(&self, doc: &Value) -> bool {
        doc.get(&self.field)
            .and_then(Value::as_str)
            .is_some_and(|v| v == self.value)
    }
}

/// A document as delivered by the store: server-assigned id plus payload
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub data: Value,
}

/// A complete, point-in-time set of documents matching a subscription
///
/// Always the full matching set, never a diff. `version` increases
/// monotonically per collection and exists for staleness detection in
/// tests, not for conflict resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub docs: Vec<RawDocument>,
}

/// Stream of snapshots delivered by a live subscription
pub type SnapshotStream = mpsc::UnboundedReceiver<Snapshot>;

/// Remote collection/document store
///
/// All durable state lives behind this trait; the client keeps nothing
/// but in-memory mirrors.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a live subscription on a collection
    ///
    /// The current snapshot is delivered immediately, then a new full
    /// snapshot follows every mutation. Dropping the stream ends the
    /// subscription.
    async fn subscribe(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> MarketResult<SnapshotStream>;

    /// Create a document with a server-assigned id
    async fn create(&self, collection: &str, doc: Value) -> MarketResult<String>;

    /// Write a document at a fixed id, replacing any existing content
    async fn put(&self, collection: &str, id: &str, doc: Value) -> MarketResult<()>;

    /// Shallow-merge `patch` into an existing document
    async fn update(&self, collection: &str, id: &str, patch: Value) -> MarketResult<()>;

    /// Read a single document, `None` if absent
    async fn read(&self, collection: &str, id: &str) -> MarketResult<Option<Value>>;
}

/// Tenant-scoped collection paths
///
/// Every logical collection lives under an application id, mirroring
/// the `artifacts/{appId}/...` layout of the remote store.
#[derive(Debug, Clone)]
pub struct Paths {
    app_id: String,
}

impl Paths {
    /// Create paths scoped to an application id
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }

    fn scoped(&self, name: &str) -> String {
        format!("artifacts/{}/{}", self.app_id, name)
    }

    /// Profile documents, keyed by identity
    pub fn profiles(&self) -> String {
        self.scoped("profiles")
    }

    /// Public product listings
    pub fn products(&self) -> String {
        self.scoped("products")
    }

    /// Orders, queryable by `buyerId` or `farmerId`
    pub fn orders(&self) -> String {
        self.scoped("orders")
    }

    /// Loan applications, queryable by `applicantId`
    pub fn loan_applications(&self) -> String {
        self.scoped("loan_applications")
    }

    /// Logistics requests, queryable by `requesterId`
    pub fn logistics_requests(&self) -> String {
        self.scoped("logistics_requests")
    }

    /// Public community chat
    pub fn chat(&self) -> String {
        self.scoped("chat")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_filter_matches() {
        let filter = FieldFilter::equals("buyerId", "buyer-1");

        assert!(filter.matches(&json!({"buyerId": "buyer-1", "status": "Pending"})));
        assert!(!filter.matches(&json!({"buyerId": "buyer-2"})));
        assert!(!filter.matches(&json!({"farmerId": "buyer-1"})));
        // Non-string values never match an equality filter
        assert!(!filter.matches(&json!({"buyerId": 42})));
    }

    #[test]
    fn test_paths_are_tenant_scoped() {
        let paths = Paths::new("demo-app");
        assert_eq!(paths.products(), "artifacts/demo-app/products");
        assert_eq!(paths.orders(), "artifacts/demo-app/orders");
        assert_eq!(paths.chat(), "artifacts/demo-app/chat");
        assert_eq!(
            paths.loan_applications(),
            "artifacts/demo-app/loan_applications"
        );
    }
}
