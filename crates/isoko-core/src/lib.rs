//! Isoko Core Library
//!
//! This crate provides the core functionality for Isoko, a real-time
//! client engine for a two-sided produce marketplace connecting farmers
//! and buyers.
//!
//! # Architecture
//!
//! - **Document store**: An external collaborator behind the
//!   [`DocumentStore`] trait; the remote database is the source of truth
//! - **Mirrors**: Local read caches replaced wholesale by each incoming
//!   snapshot, never edited in place
//! - **Write-through**: Every mutation goes to the store and is only
//!   observed locally via the next snapshot
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(MemoryStore::new());
//! let mut market = Market::new(Config::default(), store);
//!
//! // Register and list a product
//! market.register("farmer-1", "f@example.com", Role::Farmer).await?;
//! market.list_product("Tomatoes", "vegetable", "Kigali", "+250", "Fresh", 500.0).await?;
//!
//! // Open the role's live mirrors
//! let views = market.open_views().await;
//! ```
//!
//! # Modules
//!
//! - `market`: Marketplace facade (main entry point)
//! - `models`: Data structures for profiles, products, orders, and chat
//! - `store`: Document store trait and in-memory implementation
//! - `sync`: Real-time collection mirroring
//! - `lifecycle`: Order status state machine and write-through
//! - `router`: Session context and role-scoped subscriptions
//! - `views`: Catalog search and chat ordering
//! - `retry`: Exponential-backoff retry for remote calls
//! - `price`: AI price suggestion
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod market;
pub mod models;
pub mod price;
pub mod retry;
pub mod router;
pub mod store;
pub mod sync;
pub mod views;

pub use config::Config;
pub use error::{MarketError, MarketResult};
pub use lifecycle::OrderLifecycle;
pub use market::Market;
pub use models::{
    ChatMessage, LoanApplication, LoanStatus, LogisticsRequest, LogisticsStatus, Order,
    OrderStatus, Product, Profile, Role, UserId,
};
pub use price::PriceSuggester;
pub use retry::RetryPolicy;
pub use router::{plan_subscriptions, RoleViews, Session, SubscriptionSpec};
pub use store::{DocumentStore, FieldFilter, MemoryStore, Paths, RawDocument, Snapshot, SnapshotStream};
pub use sync::{Document, Mirror, MirrorHandle, SyncEngine, SyncEvent};
pub use views::{filter_products, order_messages, Authorship, TaggedMessage};
