//! Derived views over mirrors
//!
//! Pure, side-effect-free functions: the sync engine never filters or
//! sorts, so the catalog search and the ordered chat are derived here
//! on demand. Re-running with the same mirror and inputs always yields
//! the same sequence.

use crate::models::{ChatMessage, Product};
use crate::sync::{Document, Mirror};

/// Filter the product mirror by a free-text query
///
/// Case-insensitive substring match against the product name, owner
/// id, or location. An empty query returns the full mirror in mirror
/// order.
pub fn filter_products<'a>(mirror: &'a Mirror<Product>, query: &str) -> Vec<&'a Document<Product>> {
    let needle = query.trim().to_lowercase();
    mirror
        .iter()
        .filter(|doc| {
            if needle.is_empty() {
                return true;
            }
            let p = &doc.data;
            p.name.to_lowercase().contains(&needle)
                || p.owner_id.to_lowercase().contains(&needle)
                || p.location.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Whether a chat message was sent by the viewing identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorship {
    Own,
    Other,
}

/// A chat message tagged relative to the active identity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedMessage<'a> {
    pub id: &'a str,
    pub message: &'a ChatMessage,
    pub authorship: Authorship,
}

/// Order the chat mirror for display
///
/// Ascending by timestamp; ties keep mirror (arrival) order. The
/// authorship tag is derived from `viewer`, never stored.
pub fn order_messages<'a>(
    mirror: &'a Mirror<ChatMessage>,
    viewer: Option<&str>,
) -> Vec<TaggedMessage<'a>> {
    let mut messages: Vec<TaggedMessage<'a>> = mirror
        .iter()
        .map(|doc| TaggedMessage {
            id: &doc.id,
            message: &doc.data,
            authorship: match viewer {
                Some(me) if doc.data.sender_id == me => Authorship::Own,
                _ => Authorship::Other,
            },
        })
        .collect();
    messages.sort_by_key(|m| m.message.timestamp);
    messages
}
