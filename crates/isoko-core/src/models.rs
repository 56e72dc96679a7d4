//! Data models for the marketplace
//!
//! Defines the documents stored remotely: profiles, products, orders,
//! loan applications, logistics requests, and chat messages. All types
//! serialize with camelCase field names to match the wire format of the
//! document store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identity of an authenticated actor
///
/// Produced by the external identity provider; stable for the session.
pub type UserId = String;

/// Role of a marketplace participant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Buyer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Farmer => write!(f, "farmer"),
            Role::Buyer => write!(f, "buyer"),
        }
    }
}

/// User profile, one document per identity
///
/// Created once at registration and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Contact email captured at registration
    pub email: String,
    /// Marketplace role; determines which subscriptions open
    pub role: Role,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Create a new profile
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

/// A produce listing
///
/// Created by a farmer; immutable once listed and globally visible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Identity of the listing farmer
    pub owner_id: UserId,
    /// Display name
    pub name: String,
    /// Kind of produce (e.g. "vegetable", "fruit")
    #[serde(rename = "type")]
    pub produce_type: String,
    /// Where the produce is located
    pub location: String,
    /// Contact phone number
    pub phone: String,
    /// Free-text description
    pub description: String,
    /// Asking price, non-negative
    pub price: f64,
    /// When the product was listed
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product listing owned by `owner_id`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: impl Into<UserId>,
        name: impl Into<String>,
        produce_type: impl Into<String>,
        location: impl Into<String>,
        phone: impl Into<String>,
        description: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            name: name.into(),
            produce_type: produce_type.into(),
            location: location.into(),
            phone: phone.into(),
            description: description.into(),
            price,
            created_at: Utc::now(),
        }
    }
}

/// Order status state machine
///
/// `Pending` is the sole initial state, `Delivered` is terminal.
/// The only legal path is Pending -> Shipped -> Delivered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// Whether moving to `next` is a legal transition
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        self == OrderStatus::Delivered
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Shipped => write!(f, "Shipped"),
            OrderStatus::Delivered => write!(f, "Delivered"),
        }
    }
}

/// A purchase order
///
/// Product name, price, and farmer are copied at placement time; a
/// later change to the product never retroactively affects the order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// The product this order is for
    pub product_id: String,
    /// Product name snapshot
    pub product_name: String,
    /// Product price snapshot
    pub product_price: f64,
    /// Owner of the product at placement time
    pub farmer_id: UserId,
    /// Identity that placed the order
    pub buyer_id: UserId,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// When the order was placed
    pub created_at: DateTime<Utc>,
    /// Set when the farmer marks the order shipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    /// Set when the farmer marks the order delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Place a new order for `product`, copying its fields at this instant
    pub fn place(product_id: impl Into<String>, product: &Product, buyer_id: impl Into<UserId>) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product.name.clone(),
            product_price: product.price,
            farmer_id: product.owner_id.clone(),
            buyer_id: buyer_id.into(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            shipped_at: None,
            delivered_at: None,
        }
    }
}

/// Loan application status
///
/// Only `Pending` is produced by this client; further transitions
/// happen outside it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LoanStatus {
    #[default]
    Pending,
}

/// A micro-loan application, append-only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    /// Identity of the applicant
    pub applicant_id: UserId,
    /// Requested amount
    pub amount: f64,
    /// Stated purpose of the loan
    pub purpose: String,
    /// Always `Pending` when created here
    pub status: LoanStatus,
    /// When the application was submitted
    pub created_at: DateTime<Utc>,
}

impl LoanApplication {
    /// Create a new pending application
    pub fn new(applicant_id: impl Into<UserId>, amount: f64, purpose: impl Into<String>) -> Self {
        Self {
            applicant_id: applicant_id.into(),
            amount,
            purpose: purpose.into(),
            status: LoanStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Logistics request status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum LogisticsStatus {
    #[default]
    Requested,
}

/// A pickup/delivery request logged for a logistics partner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogisticsRequest {
    /// Identity of the requester
    pub requester_id: UserId,
    /// Pickup location
    pub pickup: String,
    /// Delivery location
    pub delivery: String,
    /// Always `Requested` when created here
    pub status: LogisticsStatus,
    /// When the request was submitted
    pub created_at: DateTime<Utc>,
}

impl LogisticsRequest {
    /// Create a new request
    pub fn new(
        requester_id: impl Into<UserId>,
        pickup: impl Into<String>,
        delivery: impl Into<String>,
    ) -> Self {
        Self {
            requester_id: requester_id.into(),
            pickup: pickup.into(),
            delivery: delivery.into(),
            status: LogisticsStatus::Requested,
            created_at: Utc::now(),
        }
    }
}

/// A community chat message, append-only and globally visible
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Identity of the sender
    pub sender_id: UserId,
    /// Message text
    pub text: String,
    /// Send time in epoch milliseconds (wire format of the store)
    pub timestamp: i64,
}

impl ChatMessage {
    /// Create a new message stamped with the current time
    pub fn new(sender_id: impl Into<UserId>, text: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            text: text.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product::new(
            "farmer-1",
            "Tomatoes",
            "vegetable",
            "Kigali",
            "+250700000001",
            "Fresh from the field",
            500.0,
        )
    }

    #[test]
    fn test_status_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));

        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_status_terminal() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_order_place_copies_product_fields() {
        let product = sample_product();
        let order = Order::place("prod-1", &product, "buyer-1");

        assert_eq!(order.product_id, "prod-1");
        assert_eq!(order.product_name, "Tomatoes");
        assert_eq!(order.product_price, 500.0);
        assert_eq!(order.farmer_id, "farmer-1");
        assert_eq!(order.buyer_id, "buyer-1");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.shipped_at.is_none());
        assert!(order.delivered_at.is_none());
    }

    #[test]
    fn test_order_serialization_camel_case() {
        let product = sample_product();
        let order = Order::place("prod-1", &product, "buyer-1");

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["productId"], "prod-1");
        assert_eq!(json["farmerId"], "farmer-1");
        assert_eq!(json["buyerId"], "buyer-1");
        assert_eq!(json["status"], "Pending");
        // Unset timestamps are omitted, not null
        assert!(json.get("shippedAt").is_none());
    }

    #[test]
    fn test_product_wire_type_field() {
        let product = sample_product();
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["type"], "vegetable");
        assert_eq!(json["ownerId"], "farmer-1");
    }

    #[test]
    fn test_product_roundtrip() {
        let product = sample_product();
        let json = serde_json::to_string(&product).unwrap();
        let decoded: Product = serde_json::from_str(&json).unwrap();
        assert_eq!(product, decoded);
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_value(Role::Farmer).unwrap(), "farmer");
        assert_eq!(serde_json::to_value(Role::Buyer).unwrap(), "buyer");
    }

    #[test]
    fn test_loan_defaults_pending() {
        let loan = LoanApplication::new("farmer-1", 25000.0, "Seed stock");
        assert_eq!(loan.status, LoanStatus::Pending);
        let json = serde_json::to_value(&loan).unwrap();
        assert_eq!(json["status"], "Pending");
    }

    #[test]
    fn test_chat_message_timestamp_millis() {
        let before = Utc::now().timestamp_millis();
        let msg = ChatMessage::new("user-1", "hello");
        let after = Utc::now().timestamp_millis();
        assert!(msg.timestamp >= before && msg.timestamp <= after);
    }
}
