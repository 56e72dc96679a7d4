//! Order lifecycle
//!
//! Validates and applies order status transitions. Preconditions are
//! checked against the local order mirror; the transition itself is a
//! single write-through to the store, so the caller only observes the
//! effect on the next snapshot (eventual consistency, last-write-wins
//! under concurrent transitions).

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::error::{MarketError, MarketResult};
use crate::models::{Order, OrderStatus, Product};
use crate::retry::RetryPolicy;
use crate::router::Session;
use crate::store::DocumentStore;
use crate::sync::Mirror;

/// Applies order transitions through the store
pub struct OrderLifecycle {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
    /// Orders collection path
    collection: String,
}

impl OrderLifecycle {
    /// Create a lifecycle over the given orders collection
    pub fn new(store: Arc<dyn DocumentStore>, retry: RetryPolicy, collection: impl Into<String>) -> Self {
        Self {
            store,
            retry,
            collection: collection.into(),
        }
    }

    /// Place an order for `product` as the session's identity
    ///
    /// Copies the product's name, price, and owner at this instant;
    /// the order starts `Pending`. Returns the new order id.
    pub async fn place_order(
        &self,
        session: &Session,
        product_id: &str,
        product: &Product,
    ) -> MarketResult<String> {
        let buyer = session.require_identity("place an order")?;
        let order = Order::place(product_id, product, buyer);
        let doc = serde_json::to_value(&order).map_err(|e| MarketError::Decode {
            collection: self.collection.clone(),
            source: e,
        })?;

        let id = self
            .retry
            .run(|| self.store.create(&self.collection, doc.clone()))
            .await?;
        info!(order_id = %id, product_id, buyer, "Order placed");
        Ok(id)
    }

    /// Mark an order shipped; legal only from `Pending`
    pub async fn mark_shipped(
        &self,
        session: &Session,
        orders: &Mirror<Order>,
        order_id: &str,
    ) -> MarketResult<()> {
        self.transition(session, orders, order_id, OrderStatus::Shipped)
            .await
    }

    /// Mark an order delivered; legal only from `Shipped`
    pub async fn mark_delivered(
        &self,
        session: &Session,
        orders: &Mirror<Order>,
        order_id: &str,
    ) -> MarketResult<()> {
        self.transition(session, orders, order_id, OrderStatus::Delivered)
            .await
    }

    async fn transition(
        &self,
        session: &Session,
        orders: &Mirror<Order>,
        order_id: &str,
        next: OrderStatus,
    ) -> MarketResult<()> {
        let actor = session.require_identity("update an order")?;

        let order = orders.get(order_id).ok_or_else(|| MarketError::NotFound {
            collection: self.collection.clone(),
            id: order_id.to_string(),
        })?;

        if !order.status.can_transition_to(next) {
            return Err(MarketError::InvalidTransition {
                from: order.status,
                attempted: next,
            });
        }

        let now = Utc::now();
        let patch = match next {
            OrderStatus::Shipped => json!({ "status": next, "shippedAt": now }),
            OrderStatus::Delivered => json!({ "status": next, "deliveredAt": now }),
            // Unreachable: nothing transitions back to Pending
            OrderStatus::Pending => json!({ "status": next }),
        };

        self.retry
            .run(|| self.store.update(&self.collection, order_id, patch.clone()))
            .await?;
        info!(order_id, actor, from = %order.status, to = %next, "Order transitioned");
        Ok(())
    }
}
