//! Marketplace facade
//!
//! `Market` ties the pieces together for an embedding application:
//! session management, the sync engine, the order lifecycle, and the
//! one-shot creation paths (product listing, loan application,
//! logistics request, chat message). Every write goes through the
//! store with retries; local mirrors are only ever updated by the next
//! snapshot.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::{MarketError, MarketResult};
use crate::lifecycle::OrderLifecycle;
use crate::models::{
    ChatMessage, LoanApplication, LogisticsRequest, Order, Product, Profile, Role, UserId,
};
use crate::price::PriceSuggester;
use crate::retry::RetryPolicy;
use crate::router::{RoleViews, Session};
use crate::store::{DocumentStore, Paths};
use crate::sync::{Mirror, SyncEngine, SyncEvent};

/// Client-side marketplace engine
pub struct Market {
    config: Config,
    store: Arc<dyn DocumentStore>,
    engine: SyncEngine,
    lifecycle: OrderLifecycle,
    paths: Paths,
    retry: RetryPolicy,
    session: Session,
}

impl Market {
    /// Create a market over a document store
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let paths = Paths::new(&config.app_id);
        let retry = config.retry_policy();
        let engine = SyncEngine::new(store.clone())
            .with_retry_delays(retry.initial_delay, retry.initial_delay * 32);
        let lifecycle = OrderLifecycle::new(store.clone(), retry, paths.orders());

        Self {
            config,
            store,
            engine,
            lifecycle,
            paths,
            retry,
            session: Session::anonymous(),
        }
    }

    /// The active session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Collection paths for this tenant
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Take the sync event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<tokio::sync::mpsc::UnboundedReceiver<SyncEvent>> {
        self.engine.take_events()
    }

    // ==================== Session ====================

    /// Bind an authenticated identity and look up its profile
    ///
    /// An absent profile leaves the session in the profile-incomplete
    /// state; the caller should prompt for registration.
    pub async fn sign_in(&mut self, identity: impl Into<UserId>) -> MarketResult<&Session> {
        let identity = identity.into();
        let collection = self.paths.profiles();

        let profile = match self
            .retry
            .run(|| self.store.read(&collection, &identity))
            .await?
        {
            Some(doc) => Some(serde_json::from_value::<Profile>(doc).map_err(|e| {
                MarketError::Decode {
                    collection: collection.clone(),
                    source: e,
                }
            })?),
            None => None,
        };

        match &profile {
            Some(p) => info!(identity, role = %p.role, "Signed in"),
            None => info!(identity, "Signed in without profile"),
        }
        self.session = Session::signed_in(identity, profile);
        Ok(&self.session)
    }

    /// Register a profile for an authenticated identity
    ///
    /// One profile per identity, written at a fixed id so repeated
    /// registration cannot fork it.
    pub async fn register(
        &mut self,
        identity: impl Into<UserId>,
        email: impl Into<String>,
        role: Role,
    ) -> MarketResult<&Session> {
        let identity = identity.into();
        let profile = Profile::new(email, role);
        let doc = encode(&self.paths.profiles(), &profile)?;
        let collection = self.paths.profiles();

        self.retry
            .run(|| self.store.put(&collection, &identity, doc.clone()))
            .await?;
        info!(identity, role = %role, "Registered");

        self.session = Session::signed_in(identity, Some(profile));
        Ok(&self.session)
    }

    /// Clear the session
    ///
    /// Any previously opened [`RoleViews`] must be dropped by the
    /// caller; a fresh `open_views` call happens per identity change.
    pub fn sign_out(&mut self) {
        info!("Signed out");
        self.session = Session::anonymous();
    }

    /// Open the mirrors this session's role calls for
    pub async fn open_views(&self) -> RoleViews {
        RoleViews::open(&self.engine, &self.paths, &self.session).await
    }

    // ==================== Creation paths ====================

    /// List a product for sale (farmer action)
    pub async fn list_product(
        &self,
        name: impl Into<String>,
        produce_type: impl Into<String>,
        location: impl Into<String>,
        phone: impl Into<String>,
        description: impl Into<String>,
        price: f64,
    ) -> MarketResult<String> {
        let owner = self.session.require_identity("list a product")?;
        let product = Product::new(owner, name, produce_type, location, phone, description, price);
        self.create(&self.paths.products(), &product).await
    }

    /// Submit a micro-loan application (farmer action)
    pub async fn apply_for_loan(&self, amount: f64, purpose: impl Into<String>) -> MarketResult<String> {
        let applicant = self.session.require_identity("apply for a loan")?;
        let loan = LoanApplication::new(applicant, amount, purpose);
        self.create(&self.paths.loan_applications(), &loan).await
    }

    /// Log a logistics pickup request (farmer action)
    pub async fn request_logistics(
        &self,
        pickup: impl Into<String>,
        delivery: impl Into<String>,
    ) -> MarketResult<String> {
        let requester = self.session.require_identity("request logistics")?;
        let request = LogisticsRequest::new(requester, pickup, delivery);
        self.create(&self.paths.logistics_requests(), &request).await
    }

    /// Send a community chat message
    pub async fn send_chat(&self, text: impl Into<String>) -> MarketResult<String> {
        let sender = self.session.require_identity("send a message")?;
        let message = ChatMessage::new(sender, text);
        self.create(&self.paths.chat(), &message).await
    }

    // ==================== Order lifecycle ====================

    /// Place an order for a product as the signed-in buyer
    pub async fn place_order(&self, product_id: &str, product: &Product) -> MarketResult<String> {
        self.lifecycle
            .place_order(&self.session, product_id, product)
            .await
    }

    /// Mark an order shipped (farmer action)
    pub async fn mark_shipped(&self, orders: &Mirror<Order>, order_id: &str) -> MarketResult<()> {
        self.lifecycle
            .mark_shipped(&self.session, orders, order_id)
            .await
    }

    /// Mark an order delivered (farmer action)
    pub async fn mark_delivered(&self, orders: &Mirror<Order>, order_id: &str) -> MarketResult<()> {
        self.lifecycle
            .mark_delivered(&self.session, orders, order_id)
            .await
    }

    // ==================== Price suggestion ====================

    /// Build the price-suggestion client from configuration
    pub fn price_suggester(&self) -> MarketResult<PriceSuggester> {
        PriceSuggester::new(
            &self.config.price_api_url,
            self.config.price_api_key.clone().unwrap_or_default(),
            self.retry,
        )
    }

    async fn create<T: Serialize>(&self, collection: &str, value: &T) -> MarketResult<String> {
        let doc = encode(collection, value)?;
        let id = self
            .retry
            .run(|| self.store.create(collection, doc.clone()))
            .await?;
        info!(collection, id, "Document created");
        Ok(id)
    }
}

fn encode<T: Serialize>(collection: &str, value: &T) -> MarketResult<Value> {
    serde_json::to_value(value).map_err(|e| MarketError::Decode {
        collection: collection.to_string(),
        source: e,
    })
}
