//! Session context and role routing
//!
//! The session is an explicit context object passed to every component
//! that needs the active identity; there is no ambient global. The
//! router turns a session into the set of subscriptions to open. A
//! fresh router invocation happens per identity change, and dropping
//! the previous [`RoleViews`] tears down all of its subscriptions.

use crate::error::{MarketError, MarketResult};
use crate::models::{ChatMessage, LoanApplication, Order, Product, Profile, Role, UserId};
use crate::store::{FieldFilter, Paths};
use crate::sync::{MirrorHandle, SyncEngine};

/// The authenticated state of this client
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Active identity, if signed in
    pub identity: Option<UserId>,
    /// Profile for the identity
    ///
    /// An identity without a profile is a legitimate steady state
    /// (authenticated but not yet registered), not an error.
    pub profile: Option<Profile>,
}

impl Session {
    /// A session with nobody signed in
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A signed-in session
    pub fn signed_in(identity: impl Into<UserId>, profile: Option<Profile>) -> Self {
        Self {
            identity: Some(identity.into()),
            profile,
        }
    }

    /// The role of the active profile, if any
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    /// The active identity, or `Unauthenticated` naming the action
    pub fn require_identity(&self, action: &'static str) -> MarketResult<&str> {
        self.identity
            .as_deref()
            .ok_or(MarketError::Unauthenticated { action })
    }
}

/// One subscription the router decided to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    pub collection: String,
    pub filter: Option<FieldFilter>,
}

/// Decide which subscriptions a session gets
///
/// No identity, or an identity without a profile, opens nothing.
/// Farmers watch the catalog, their own loans, the community chat, and
/// orders addressed to them; buyers watch the catalog and their own
/// orders.
pub fn plan_subscriptions(paths: &Paths, session: &Session) -> Vec<SubscriptionSpec> {
    let Some(identity) = session.identity.as_deref() else {
        return Vec::new();
    };
    let Some(role) = session.role() else {
        return Vec::new();
    };

    match role {
        Role::Farmer => vec![
            SubscriptionSpec {
                collection: paths.products(),
                filter: None,
            },
            SubscriptionSpec {
                collection: paths.loan_applications(),
                filter: Some(FieldFilter::equals("applicantId", identity)),
            },
            SubscriptionSpec {
                collection: paths.chat(),
                filter: None,
            },
            SubscriptionSpec {
                collection: paths.orders(),
                filter: Some(FieldFilter::equals("farmerId", identity)),
            },
        ],
        Role::Buyer => vec![
            SubscriptionSpec {
                collection: paths.products(),
                filter: None,
            },
            SubscriptionSpec {
                collection: paths.orders(),
                filter: Some(FieldFilter::equals("buyerId", identity)),
            },
        ],
    }
}

/// The live mirrors for one session
///
/// Fields are `None` when the role does not subscribe to that
/// collection. Dropping this struct tears every handle down.
#[derive(Default)]
pub struct RoleViews {
    pub products: Option<MirrorHandle<Product>>,
    pub orders: Option<MirrorHandle<Order>>,
    pub loans: Option<MirrorHandle<LoanApplication>>,
    pub chat: Option<MirrorHandle<ChatMessage>>,
}

impl RoleViews {
    /// Open the mirrors [`plan_subscriptions`] calls for
    pub async fn open(engine: &SyncEngine, paths: &Paths, session: &Session) -> Self {
        let (Some(identity), Some(role)) = (session.identity.as_deref(), session.role()) else {
            return Self::default();
        };

        match role {
            Role::Farmer => Self {
                products: Some(engine.open_mirror(&paths.products(), None).await),
                orders: Some(
                    engine
                        .open_mirror(
                            &paths.orders(),
                            Some(FieldFilter::equals("farmerId", identity)),
                        )
                        .await,
                ),
                loans: Some(
                    engine
                        .open_mirror(
                            &paths.loan_applications(),
                            Some(FieldFilter::equals("applicantId", identity)),
                        )
                        .await,
                ),
                chat: Some(engine.open_mirror(&paths.chat(), None).await),
            },
            Role::Buyer => Self {
                products: Some(engine.open_mirror(&paths.products(), None).await),
                orders: Some(
                    engine
                        .open_mirror(
                            &paths.orders(),
                            Some(FieldFilter::equals("buyerId", identity)),
                        )
                        .await,
                ),
                loans: None,
                chat: None,
            },
        }
    }
}
